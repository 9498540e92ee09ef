//! Word corpus partitioned by proficiency tier.
//!
//! The built-in dataset pairs Russian prompts with accepted English translations.
//! Custom corpora use the same shape as JSON: an object keyed by tier name whose
//! values are arrays of `{ "text": ..., "answers": [...] }`.

use crate::error::CorpusError;
use log::debug;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// CEFR-style proficiency bucket.
///
/// Declaration order is the difficulty order. `A0` is only ever produced as a
/// scoring floor and is never assigned to a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProficiencyTier {
    A0,
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl ProficiencyTier {
    /// Tiers that words are drawn from, easiest first.
    pub const GAME_TIERS: [ProficiencyTier; 6] = [
        ProficiencyTier::A1,
        ProficiencyTier::A2,
        ProficiencyTier::B1,
        ProficiencyTier::B2,
        ProficiencyTier::C1,
        ProficiencyTier::C2,
    ];

    /// Position on the scale, `A0` = 0 through `C2` = 6.
    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProficiencyTier::A0 => "A0",
            ProficiencyTier::A1 => "A1",
            ProficiencyTier::A2 => "A2",
            ProficiencyTier::B1 => "B1",
            ProficiencyTier::B2 => "B2",
            ProficiencyTier::C1 => "C1",
            ProficiencyTier::C2 => "C2",
        }
    }
}

impl fmt::Display for ProficiencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProficiencyTier {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A0" => Ok(ProficiencyTier::A0),
            "A1" => Ok(ProficiencyTier::A1),
            "A2" => Ok(ProficiencyTier::A2),
            "B1" => Ok(ProficiencyTier::B1),
            "B2" => Ok(ProficiencyTier::B2),
            "C1" => Ok(ProficiencyTier::C1),
            "C2" => Ok(ProficiencyTier::C2),
            _ => Err(CorpusError::UnknownTier(s.to_string())),
        }
    }
}

/// A prompt and its accepted translations. The first answer is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub answers: Vec<String>,
    pub tier: ProficiencyTier,
}

impl Word {
    pub fn new(text: &str, answers: &[&str], tier: ProficiencyTier) -> Self {
        Self {
            text: text.to_string(),
            answers: answers.iter().map(|a| a.to_string()).collect(),
            tier,
        }
    }
}

/// On-disk entry; the tier comes from the enclosing key.
#[derive(Debug, Deserialize)]
struct WordEntry {
    text: String,
    answers: Vec<String>,
}

const BUILTIN_WORDS: &[(&str, &[&str], ProficiencyTier)] = &[
    ("КОШКА", &["cat"], ProficiencyTier::A1),
    ("СОБАКА", &["dog"], ProficiencyTier::A1),
    ("ДОМ", &["house", "home"], ProficiencyTier::A1),
    ("ВОДА", &["water"], ProficiencyTier::A1),
    ("КНИГА", &["book"], ProficiencyTier::A1),
    ("РЫБА", &["fish"], ProficiencyTier::A1),
    ("СОЛНЦЕ", &["sun"], ProficiencyTier::A2),
    ("ДЕРЕВО", &["tree"], ProficiencyTier::A2),
    ("ЯБЛОКО", &["apple"], ProficiencyTier::A2),
    ("ХЛЕБ", &["bread"], ProficiencyTier::A2),
    ("МОЛОКО", &["milk"], ProficiencyTier::A2),
    ("ПТИЦА", &["bird"], ProficiencyTier::A2),
    ("ЦВЕТОК", &["flower"], ProficiencyTier::B1),
    ("ДРУГ", &["friend"], ProficiencyTier::B1),
    ("ШКОЛА", &["school"], ProficiencyTier::B1),
    ("ГОРОД", &["city", "town"], ProficiencyTier::B1),
    ("МУЗЫКА", &["music"], ProficiencyTier::B1),
    ("ВРЕМЯ", &["time"], ProficiencyTier::B2),
    ("РАБОТА", &["work", "job"], ProficiencyTier::B2),
    ("СЧАСТЬЕ", &["happiness", "happy"], ProficiencyTier::B2),
    ("УСПЕХ", &["success"], ProficiencyTier::B2),
    ("ОПЫТ", &["experience"], ProficiencyTier::B2),
    ("ЗНАНИЕ", &["knowledge"], ProficiencyTier::C1),
    ("СМЕЛОСТЬ", &["courage", "bravery"], ProficiencyTier::C1),
    ("ПРИКЛЮЧЕНИЕ", &["adventure"], ProficiencyTier::C1),
    ("ВЫЗОВ", &["challenge", "dare"], ProficiencyTier::C1),
    ("ТВОРЧЕСТВО", &["creativity", "creation"], ProficiencyTier::C2),
    ("ВОЗМОЖНОСТЬ", &["opportunity", "chance", "possibility"], ProficiencyTier::C2),
    ("ДОСТИЖЕНИЕ", &["achievement", "accomplishment"], ProficiencyTier::C2),
    ("УВЕРЕННОСТЬ", &["confidence"], ProficiencyTier::C2),
];

static BUILTIN: Lazy<Corpus> = Lazy::new(|| {
    Corpus::from_words(
        BUILTIN_WORDS
            .iter()
            .map(|(text, answers, tier)| Word::new(text, answers, *tier)),
    )
});

/// Immutable word source, grouped by tier.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    tiers: BTreeMap<ProficiencyTier, Vec<Word>>,
}

impl Corpus {
    pub fn builtin() -> &'static Corpus {
        &BUILTIN
    }

    pub fn from_words(words: impl IntoIterator<Item = Word>) -> Self {
        let mut tiers: BTreeMap<ProficiencyTier, Vec<Word>> = BTreeMap::new();
        for word in words {
            tiers.entry(word.tier).or_default().push(word);
        }
        Self { tiers }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CorpusError> {
        let raw: BTreeMap<String, Vec<WordEntry>> = serde_json::from_str(json)?;
        let mut words = Vec::new();
        for (key, entries) in raw {
            let tier: ProficiencyTier = key.parse()?;
            if tier == ProficiencyTier::A0 {
                return Err(CorpusError::ReservedTier(tier));
            }
            for entry in entries {
                if entry.answers.is_empty() {
                    return Err(CorpusError::NoAnswers(entry.text));
                }
                words.push(Word {
                    text: entry.text,
                    answers: entry.answers,
                    tier,
                });
            }
        }
        Ok(Self::from_words(words))
    }

    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let json = std::fs::read_to_string(path)?;
        let corpus = Self::from_json_str(&json)?;
        debug!("Loaded corpus from {:?}: {} words", path, corpus.len());
        Ok(corpus)
    }

    pub fn words(&self, tier: ProficiencyTier) -> &[Word] {
        self.tiers.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.tiers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that every game tier can supply `per_tier` words.
    pub fn validate(&self, per_tier: usize) -> Result<(), CorpusError> {
        for tier in ProficiencyTier::GAME_TIERS {
            let available = self.words(tier).len();
            if available < per_tier {
                return Err(CorpusError::TierTooSmall {
                    tier,
                    available,
                    required: per_tier,
                });
            }
        }
        Ok(())
    }

    /// Draws `per_tier` shuffled words from each tier, concatenated easiest first.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        per_tier: usize,
        rng: &mut R,
    ) -> Result<Vec<Word>, CorpusError> {
        self.validate(per_tier)?;

        let mut selected = Vec::with_capacity(per_tier * ProficiencyTier::GAME_TIERS.len());
        for tier in ProficiencyTier::GAME_TIERS {
            let mut pool = self.words(tier).to_vec();
            pool.shuffle(rng);
            selected.extend(pool.into_iter().take(per_tier));
        }
        Ok(selected)
    }
}
