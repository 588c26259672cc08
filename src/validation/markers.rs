/*!
 * Language marker tables and the marker-frequency detector.
 *
 * A marker is a closed-class word (articles, pronouns, auxiliaries,
 * conjunctions) or, for CJK scripts, a particle character that occurs in
 * almost every sentence of one language and rarely in others. Counting them
 * is a cheap stand-in for a language classifier: good enough to tell whether
 * a model answered in the requested language, not good enough to identify
 * arbitrary text.
 *
 * Word-type languages are matched against the lower-cased text padded with
 * spaces, so markers carry their own boundary spaces (`" the "`). Character
 * languages are matched as raw substrings.
 */

use log::trace;
use serde::Serialize;

/// Score divisor that maps a detection score onto a 0..1 confidence
pub const CONFIDENCE_SCALE: f64 = 50.0;

/// How markers of a language are delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// Space-delimited tokens, counted on padded lower-cased text
    Word,
    /// Characters or bigrams, counted as raw substrings
    Character,
}

/// Static marker data for one language
#[derive(Debug)]
pub struct LanguageMarkerTable {
    /// ISO 639-1 code
    pub code: &'static str,
    /// Matching mode
    pub script: ScriptType,
    /// Marker tokens
    pub markers: &'static [&'static str],
    /// Minimum hits before the language is considered present
    pub min_markers: usize,
}

static MARKER_TABLES: &[LanguageMarkerTable] = &[
    LanguageMarkerTable {
        code: "en",
        script: ScriptType::Word,
        markers: &[
            " the ", " a ", " an ", " this ", " that ", " these ", " those ",
            " some ", " any ", " no ", " every ", " each ", " all ", " both ",
            " i ", " you ", " he ", " she ", " it ", " we ", " they ",
            " me ", " him ", " her ", " us ", " them ", " my ", " your ",
            " his ", " its ", " our ", " their ", " mine ", " yours ",
            " who ", " whom ", " whose ", " which ", " what ",
            " is ", " are ", " was ", " were ", " be ", " been ", " being ",
            " have ", " has ", " had ", " having ", " do ", " does ", " did ",
            " will ", " would ", " shall ", " should ", " can ", " could ",
            " may ", " might ", " must ", " need ", " dare ", " ought ",
            " said ", " says ", " told ", " asked ", " answered ", " replied ",
            " went ", " came ", " got ", " made ", " took ", " gave ", " knew ",
            " thought ", " felt ", " saw ", " heard ", " seemed ", " looked ",
            " in ", " on ", " at ", " by ", " for ", " with ", " about ",
            " against ", " between ", " into ", " through ", " during ",
            " before ", " after ", " above ", " below ", " from ", " up ",
            " down ", " out ", " off ", " over ", " under ", " again ",
            " and ", " but ", " or ", " nor ", " so ", " yet ", " because ",
            " although ", " while ", " if ", " unless ", " until ", " when ",
            " where ", " whether ", " however ", " therefore ", " moreover ",
            " not ", " very ", " really ", " just ", " also ", " only ",
            " even ", " still ", " already ", " always ", " never ", " often ",
            " sometimes ", " usually ", " here ", " there ", " now ", " then ",
            " of the ", " to the ", " in the ", " on the ", " at the ",
            " and the ", " for the ", " with the ", " from the ",
            " there is ", " there are ", " there was ", " there were ",
        ],
        min_markers: 3,
    },
    LanguageMarkerTable {
        code: "es",
        script: ScriptType::Word,
        markers: &[
            " el ", " la ", " los ", " las ", " un ", " una ", " unos ", " unas ",
            " de ", " del ", " al ", " en ", " con ", " por ", " para ", " sin ",
            " sobre ", " entre ", " hacia ", " desde ", " hasta ", " según ",
            " durante ", " mediante ", " contra ", " ante ", " bajo ",
            " yo ", " tú ", " él ", " ella ", " usted ", " nosotros ", " ellos ",
            " ellas ", " ustedes ", " me ", " te ", " le ", " nos ", " les ",
            " lo ", " se ", " mi ", " tu ", " su ", " mis ", " tus ", " sus ",
            " que ", " quien ", " cual ", " cuyo ", " donde ", " como ", " cuando ",
            " es ", " son ", " era ", " eran ", " fue ", " fueron ", " ser ", " sido ",
            " está ", " están ", " estaba ", " estuvo ", " estar ", " estado ",
            " ha ", " han ", " había ", " hubo ", " haber ", " habido ",
            " tiene ", " tienen ", " tenía ", " tuvo ", " tener ", " tenido ",
            " y ", " e ", " o ", " u ", " pero ", " sino ", " aunque ", " porque ",
            " no ", " sí ", " muy ", " más ", " menos ", " bien ", " mal ",
            " de la ", " de los ", " de las ", " en el ", " en la ",
        ],
        min_markers: 3,
    },
    LanguageMarkerTable {
        code: "fr",
        script: ScriptType::Word,
        markers: &[
            " le ", " la ", " les ", " un ", " une ", " des ", " du ", " de la ",
            " l'", " d'", " n'", " s'", " c'", " j'", " m'", " t'", " qu'",
            " de ", " à ", " en ", " dans ", " sur ", " sous ", " avec ", " sans ",
            " pour ", " par ", " chez ", " vers ", " entre ", " contre ",
            " je ", " tu ", " il ", " elle ", " on ", " nous ", " vous ", " ils ", " elles ",
            " est ", " sont ", " était ", " étaient ", " fut ", " être ", " été ",
            " a ", " ont ", " avait ", " avaient ", " eut ", " avoir ", " eu ",
            " et ", " ou ", " mais ", " donc ", " car ", " ni ", " or ",
            " ne ", " pas ", " plus ", " jamais ", " rien ", " personne ",
            " c'est ", " c'était ", " il y a ", " il y avait ",
        ],
        min_markers: 3,
    },
    LanguageMarkerTable {
        code: "de",
        script: ScriptType::Word,
        markers: &[
            " der ", " die ", " das ", " den ", " dem ", " des ",
            " ein ", " eine ", " einen ", " einem ", " einer ", " eines ",
            " in ", " an ", " auf ", " für ", " mit ", " von ", " zu ", " bei ",
            " ich ", " du ", " er ", " sie ", " es ", " wir ", " ihr ",
            " ist ", " sind ", " war ", " waren ", " sein ", " gewesen ",
            " hat ", " haben ", " hatte ", " hatten ", " gehabt ",
            " und ", " oder ", " aber ", " denn ", " weil ", " dass ", " daß ",
            " nicht ", " auch ", " nur ", " noch ", " schon ", " sehr ",
        ],
        min_markers: 3,
    },
    LanguageMarkerTable {
        code: "it",
        script: ScriptType::Word,
        markers: &[
            " il ", " lo ", " la ", " i ", " gli ", " le ",
            " un ", " uno ", " una ", " un'", " del ", " dello ", " della ",
            " l'", " d'", " c'", " n'", " s'",
            " di ", " a ", " da ", " in ", " con ", " su ", " per ", " tra ", " fra ",
            " io ", " tu ", " lui ", " lei ", " noi ", " voi ", " loro ",
            " è ", " sono ", " era ", " erano ", " fu ", " furono ", " essere ", " stato ",
            " e ", " o ", " ma ", " però ", " perché ", " poiché ", " quando ",
            " non ", " sì ", " molto ", " poco ", " più ", " meno ", " bene ", " male ",
        ],
        min_markers: 3,
    },
    LanguageMarkerTable {
        code: "pt",
        script: ScriptType::Word,
        markers: &[
            " o ", " a ", " os ", " as ", " um ", " uma ", " uns ", " umas ",
            " do ", " da ", " dos ", " das ", " no ", " na ", " nos ", " nas ",
            " de ", " em ", " com ", " por ", " para ", " sem ", " sob ", " sobre ",
            " eu ", " tu ", " ele ", " ela ", " você ", " nós ", " eles ", " elas ",
            " é ", " são ", " era ", " eram ", " foi ", " foram ", " ser ", " sido ",
            " e ", " ou ", " mas ", " porém ", " contudo ", " todavia ", " porque ",
            " não ", " sim ", " muito ", " pouco ", " mais ", " menos ", " bem ", " mal ",
        ],
        min_markers: 3,
    },
    LanguageMarkerTable {
        code: "ru",
        script: ScriptType::Word,
        markers: &[
            " в ", " на ", " с ", " к ", " у ", " о ", " за ", " из ", " по ", " от ",
            " я ", " ты ", " он ", " она ", " оно ", " мы ", " вы ", " они ",
            " это ", " этот ", " эта ", " эти ", " тот ", " та ", " те ",
            " был ", " была ", " было ", " были ", " есть ", " быть ", " будет ",
            " и ", " а ", " но ", " или ", " да ", " ни ", " же ", " ли ",
            " не ", " ещё ", " уже ", " очень ", " так ", " как ", " тоже ", " также ",
        ],
        min_markers: 3,
    },
    LanguageMarkerTable {
        code: "zh",
        script: ScriptType::Character,
        markers: &[
            "的", "了", "是", "在", "有", "和", "与", "或", "但", "而",
            "我", "你", "他", "她", "它", "们", "这", "那", "什么", "怎么",
            "不", "也", "都", "就", "还", "又", "才", "已", "很", "太",
            "着", "过", "地", "得", "吗", "呢", "吧", "啊", "呀", "哦",
            "如果", "虽然", "但是", "因为", "所以", "而且", "或者", "不过",
        ],
        min_markers: 5,
    },
    LanguageMarkerTable {
        code: "ja",
        script: ScriptType::Character,
        markers: &[
            "の", "は", "が", "を", "に", "で", "と", "も", "や", "か",
            "です", "ます", "でした", "ました", "である", "ではない",
            "ない", "なかった", "ある", "あった", "いる", "いた",
            "この", "その", "あの", "どの", "これ", "それ", "あれ", "どれ",
            "という", "として", "について", "によって", "に対して",
        ],
        min_markers: 5,
    },
    LanguageMarkerTable {
        code: "ko",
        script: ScriptType::Character,
        markers: &[
            "은", "는", "이", "가", "을", "를", "의", "에", "에서", "로",
            "이다", "입니다", "이에요", "예요", "였다", "였습니다",
            "하다", "합니다", "해요", "했다", "했습니다", "하는",
            "있다", "있습니다", "있어요", "없다", "없습니다", "없어요",
            "그리고", "그러나", "하지만", "그래서", "왜냐하면", "만약",
        ],
        min_markers: 5,
    },
];

impl LanguageMarkerTable {
    /// Look up the table for a language code (`"en"`, `"EN"`, `"eng"` all work)
    pub fn for_language(code: &str) -> Option<&'static LanguageMarkerTable> {
        let code = code.trim().to_lowercase();
        MARKER_TABLES
            .iter()
            .find(|table| table.code == code)
            .or_else(|| {
                let normalized = crate::language_utils::normalize_code(&code).ok()?;
                MARKER_TABLES.iter().find(|table| table.code == normalized)
            })
    }

    /// All languages with marker data
    pub fn all() -> &'static [LanguageMarkerTable] {
        MARKER_TABLES
    }

    /// Codes of all languages with marker data
    pub fn supported_codes() -> Vec<&'static str> {
        Self::all().iter().map(|table| table.code).collect()
    }

    /// Whether this language is counted by characters (CJK)
    pub fn is_character_based(&self) -> bool {
        self.script == ScriptType::Character
    }
}

/// Marker hits of one language in a text
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerMatch {
    /// Total marker occurrences
    pub count: usize,
    /// Distinct markers that occurred at least once, trimmed
    pub matched: Vec<String>,
    /// Occurrences per word (word scripts) or per character (character scripts)
    pub density: f64,
}

/// Best-guess language of a text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedLanguage {
    /// ISO 639-1 code, or `"unknown"`
    pub code: String,
    /// Normalized score in `[0, 1]`
    pub confidence: f64,
}

impl DetectedLanguage {
    /// Whether any candidate scored at all
    pub fn is_known(&self) -> bool {
        self.code != "unknown"
    }
}

/// Counts language markers in text
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageMarkerDetector;

impl LanguageMarkerDetector {
    /// Create a detector with the standard confidence scale
    pub fn new() -> Self {
        Self
    }

    /// Count markers of `language` in `text`; unknown languages yield an empty match
    pub fn detect(&self, text: &str, language: &str) -> MarkerMatch {
        match LanguageMarkerTable::for_language(language) {
            Some(table) => Self::count_markers(text, table),
            None => MarkerMatch::default(),
        }
    }

    /// Count markers of a specific table in `text`
    pub fn count_markers(text: &str, table: &LanguageMarkerTable) -> MarkerMatch {
        let (haystack, units) = match table.script {
            ScriptType::Word => {
                // Collapse line breaks so markers at line edges still see their boundary space
                let words: Vec<&str> = text.split_whitespace().collect();
                (format!(" {} ", words.join(" ").to_lowercase()), words.len())
            }
            ScriptType::Character => (text.to_string(), text.chars().count()),
        };

        let mut count = 0;
        let mut matched = Vec::new();
        for marker in table.markers {
            let hits = haystack.matches(marker).count();
            if hits > 0 {
                count += hits;
                matched.push(marker.trim().to_string());
            }
        }

        let density = if units > 0 { count as f64 / units as f64 } else { 0.0 };
        trace!("{} markers for '{}' (density {:.3})", count, table.code, density);

        MarkerMatch {
            count,
            matched,
            density,
        }
    }

    /// Pick the most likely language among `candidates` (all known languages when `None`)
    pub fn detect_language(&self, text: &str, candidates: Option<&[&str]>) -> DetectedLanguage {
        let tables: Vec<&LanguageMarkerTable> = match candidates {
            Some(codes) => codes
                .iter()
                .filter_map(|code| LanguageMarkerTable::for_language(code))
                .collect(),
            None => LanguageMarkerTable::all().iter().collect(),
        };

        let mut best_code = "unknown";
        let mut best_score = 0.0;
        for table in tables {
            let hits = Self::count_markers(text, table);
            if hits.count >= table.min_markers {
                let score = hits.count as f64 * (1.0 + hits.density);
                if score > best_score {
                    best_score = score;
                    best_code = table.code;
                }
            }
        }

        DetectedLanguage {
            code: best_code.to_string(),
            confidence: (best_score / CONFIDENCE_SCALE).min(1.0),
        }
    }
}
