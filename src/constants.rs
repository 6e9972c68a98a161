//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Facts document constants
pub mod facts {
    /// Schema tag written into every facts document
    pub const SCHEMA: &str = "facts.v1";

    /// Maximum evidence pointers kept per language fact
    pub const MAX_LANGUAGE_EVIDENCE: usize = 5;

    /// Decimal places kept for language ratios
    pub const RATIO_PRECISION: i32 = 2;
}

/// Source tree scanning constants
pub mod scan {
    /// Default maximum file size to read (1MB)
    pub const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Directories never descended into
    pub const SKIP_DIRS: &[&str] = &[
        "node_modules",
        "target",
        ".git",
        "build",
        "dist",
        "__pycache__",
        "vendor",
        ".venv",
        "venv",
    ];
}

/// Context pack constants
pub mod context {
    /// Average characters per token for latin text
    pub const CHARS_PER_TOKEN: f64 = 4.0;

    /// Average characters per token when the text is mostly Cyrillic
    pub const CHARS_PER_TOKEN_CYRILLIC: f64 = 3.5;

    /// Share of Cyrillic letters above which the Cyrillic ratio applies
    pub const CYRILLIC_THRESHOLD: f64 = 0.3;

    /// Fixed per-message overhead in tokens
    pub const MESSAGE_OVERHEAD_TOKENS: usize = 10;

    /// Default synopsis length in characters
    pub const SYNOPSIS_MAX_CHARS: usize = 600;

    /// Synopsis bullet bounds
    pub const SYNOPSIS_MIN_BULLETS: usize = 3;
    pub const SYNOPSIS_MAX_BULLETS: usize = 7;

    /// Endpoint facts offered to a single pack at most
    pub const MAX_ENDPOINT_FACTS: usize = 20;
}

/// Pipeline constants
pub mod pipeline {
    /// Default attempts per section (first call plus retries)
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 8;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Default time box for one generation call (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
}

/// Practice validation constants
pub mod practice {
    /// Default minimum number of recognized entities
    pub const MIN_ENTITIES: usize = 2;

    /// Domain terms recognized as entities by default
    pub const DOMAIN_TERMS: &[&str] = &[
        "User",
        "Document",
        "Section",
        "Artifact",
        "Project",
        "Analysis",
        "Context",
        "Outline",
        "LLM",
        "API",
        "Client",
        "Service",
        "Model",
        "Controller",
        "View",
        "Handler",
    ];

    /// Score contributions
    pub const ENTITY_WEIGHT: f64 = 0.4;
    pub const ALGORITHM_WEIGHT: f64 = 0.3;
    pub const TABLE_WEIGHT: f64 = 0.3;
}

/// Quality report constants
pub mod quality {
    /// Phrase length used for repetition scoring
    pub const NGRAM_SIZE: usize = 3;

    /// Minimum n-grams before repetition is scored
    pub const MIN_NGRAMS: usize = 10;

    /// An n-gram counts as repeated above this many occurrences
    pub const REPEAT_OCCURRENCES: usize = 2;

    /// Repetition score above which a warning is raised
    pub const REPETITION_THRESHOLD: f64 = 0.1;

    /// Cross-section phrase lengths
    pub const CROSS_MIN_NGRAM: usize = 4;
    pub const CROSS_MAX_NGRAM: usize = 6;

    /// Cross-section phrase must occur at least this often
    pub const CROSS_MIN_COUNT: usize = 3;

    /// Default section length thresholds (words)
    pub const MIN_SECTION_WORDS: usize = 300;
    pub const MAX_SECTION_WORDS: usize = 3000;

    /// Non-empty sections below this many characters are placeholders
    pub const MIN_CONTENT_CHARS: usize = 200;

    /// Sections of few sentences below this many characters are placeholders
    pub const MIN_SECTION_CHARS: usize = 500;

    /// Sentence count at or below which `MIN_SECTION_CHARS` applies
    pub const MAX_PLACEHOLDER_SENTENCES: usize = 2;

    /// Distinct missing-information phrases that mark a section as a placeholder
    pub const MISSING_INFO_LIMIT: usize = 2;

    /// Unfinished-text markers, matched case-insensitively anywhere
    pub const PLACEHOLDER_MARKERS: &[&str] = &[
        r"\[TBD\]",
        r"\[TODO\]",
        r"\[placeholder\]",
        r"\[здесь будет текст\]",
        r"\[текст секции\]",
        r"\[заполнить\]",
        r"\[добавить\]",
        r"(?m)^[ \t]*(?:TODO|TBD)[ \t]*:",
        r"Lorem ipsum",
        r"Текст заглушка",
        r"Заглушка",
    ];

    /// Generic openings; matched at the start of a line
    pub const FILLER_PATTERNS: &[&str] = &[
        r"Введение\.?\s*$",
        r"Заключение\.?\s*$",
        r"В данной секции",
        r"В данном разделе",
        r"Данная секция",
        r"Данный раздел",
        r"Здесь будет",
        r"Этот раздел посвящен",
        r"Рассматриваются вопросы",
        r"In this section",
        r"This section (?:describes|covers|will)",
    ];

    /// Phrases stating that information is not available
    pub const MISSING_INFO_MARKERS: &[&str] = &[
        "нет данных",
        "отсутствует информация",
        "данные не предоставлены",
        "информация недоступна",
        "не удалось найти",
        "данные отсутствуют",
    ];
}
