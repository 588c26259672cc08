/*!
 * Tests for document segmentation
 */

use booktrans::translation::TextSegmenter;
use booktrans::translation::segmenter::normalize_text;

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[test]
fn test_split_withBookLikeText_shouldKeepEveryWordInOrder() {
    let paragraph = "It was a bright cold day in April, and the clocks were striking thirteen. \
                     Winston Smith slipped quickly through the glass doors of Victory Mansions, \
                     though not quickly enough to prevent a swirl of gritty dust from entering along with him.";
    let text = format!("{p}\n\n{p}\n\n\n\n{p}", p = paragraph);
    let segmenter = TextSegmenter::new(120);

    let chunks = segmenter.split(&text);
    let rejoined = chunks.join(" ");

    assert!(chunks.len() > 3);
    assert_eq!(words(&rejoined), words(&normalize_text(&text)));
}

#[test]
fn test_split_withDivisibleText_shouldRespectLimit() {
    let text = "One short sentence. Another short sentence. Yet another one here.\n\nA second paragraph, with clauses, that goes on.";
    let segmenter = TextSegmenter::new(30);

    for chunk in segmenter.split(text) {
        assert!(chunk.chars().count() <= 30, "chunk over limit: {:?}", chunk);
    }
}

#[test]
fn test_split_withIndivisibleWord_shouldPassItThroughWhole() {
    let word = "Pneumonoultramicroscopicsilicovolcanoconiosis";
    let segmenter = TextSegmenter::new(20);

    assert_eq!(segmenter.split(word), vec![word.to_string()]);
}

#[test]
fn test_split_withWhitespaceOnly_shouldReturnOriginalAsSingleChunk() {
    let segmenter = TextSegmenter::new(100);
    assert_eq!(segmenter.split("   \n\n  "), vec!["   \n\n  ".to_string()]);
}

#[test]
fn test_split_withWindowsLineEndings_shouldSplitParagraphs() {
    let segmenter = TextSegmenter::new(15);
    let chunks = segmenter.split("First part.\r\n\r\nSecond part.");
    assert_eq!(chunks, vec!["First part.", "Second part."]);
}
