use serde::{Deserialize, Serialize};

use crate::similarity::word_tokens;

struct EmotionCategory {
    weight: i32,
    keywords: &'static [&'static str],
}

const FRUSTRATION: EmotionCategory = EmotionCategory {
    weight: 3,
    keywords: &[
        "还是不行",
        "又失败了",
        "为什么还",
        "到底怎么",
        "试了很多次",
        "same error",
        "same problem",
        "still not",
        "doesn't work",
    ],
};

const STUCK: EmotionCategory = EmotionCategory {
    weight: 4,
    keywords: &[
        "一样的",
        "还是这个问题",
        "依然",
        "still the same",
        "nothing changed",
        "unchanged",
    ],
};

const EXPLORATION: EmotionCategory = EmotionCategory {
    weight: -2,
    keywords: &[
        "换个",
        "试试",
        "或者",
        "another",
        "different",
        "alternative",
        "if we try",
    ],
};

const REFINEMENT: EmotionCategory = EmotionCategory {
    weight: -1,
    keywords: &[
        "better", "optimize", "simplify", "improve", "adjust", "tweak", "enhance", "优化", "改进",
        "调整",
    ],
};

const EMOTION_CATEGORIES: [EmotionCategory; 4] = [FRUSTRATION, STUCK, EXPLORATION, REFINEMENT];

/// "same <problem>" reads as stuck; "<failure> again" as frustration. Suffix
/// matching lets "same TypeError" count.
const PROBLEM_SUFFIXES: &[&str] = &["error", "issue", "problem", "bug", "exception", "traceback"];
const FAILURE_SUFFIXES: &[&str] = &[
    "error", "fail", "failed", "fails", "failing", "crash", "crashed", "crashes", "broken",
    "exception",
];

const DEBUG_REPEAT_KEYWORDS: &[&str] = &["error", "bug", "fix", "修复", "报错"];

/// Sums the category weight of every keyword present in `text`.
/// Positive totals mean frustration, negative ones healthy exploration.
pub fn emotion_score(text: &str) -> i32 {
    let lowered = text.to_lowercase();
    let keywords: i32 = EMOTION_CATEGORIES
        .iter()
        .map(|category| {
            let hits = category
                .keywords
                .iter()
                .filter(|keyword| lowered.contains(*keyword))
                .count() as i32;
            hits * category.weight
        })
        .sum();
    keywords + repeated_failure_score(text)
}

/// Adjacent word pairs naming a repeated failure. Bare "same" and "again"
/// are too common in ordinary requests to count on their own.
fn repeated_failure_score(text: &str) -> i32 {
    word_tokens(text)
        .windows(2)
        .map(|pair| {
            let (first, second) = (pair[0].as_str(), pair[1].as_str());
            let mut score = 0;
            if first == "same" && ends_with_any(second, PROBLEM_SUFFIXES) {
                score += STUCK.weight;
            }
            if second == "again" && ends_with_any(first, FAILURE_SUFFIXES) {
                score += FRUSTRATION.weight;
            }
            score
        })
        .sum()
}

fn ends_with_any(word: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| word.ends_with(suffix))
}

pub fn contains_debug_keyword(text: &str) -> bool {
    let text = text.to_lowercase();
    DEBUG_REPEAT_KEYWORDS
        .iter()
        .any(|keyword| text.contains(keyword))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Coding,
    Writing,
    Debugging,
    Research,
    Exploration,
}

/// Declared priority order; earlier entries win ties.
const TASK_PRIORITY: [TaskType; 4] = [
    TaskType::Coding,
    TaskType::Writing,
    TaskType::Debugging,
    TaskType::Research,
];

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Coding => "coding",
            TaskType::Writing => "writing",
            TaskType::Debugging => "debugging",
            TaskType::Research => "research",
            TaskType::Exploration => "exploration",
        }
    }

    pub fn allowed_iterations(&self) -> u32 {
        match self {
            TaskType::Coding => 5,
            TaskType::Writing => 3,
            TaskType::Debugging => 3,
            TaskType::Research => 10,
            TaskType::Exploration => 5,
        }
    }

    fn indicators(&self) -> &'static [&'static str] {
        match self {
            TaskType::Coding => &[
                "def ", "function", "class ", "import", "代码", "method", "variable", "debug",
                "error",
            ],
            TaskType::Writing => &[
                "write",
                "help me write",
                "润色",
                "改写",
                "translate",
                "writing",
                "draft",
            ],
            TaskType::Debugging => &[
                "error", "bug", "fix", "debug", "problem", "报错", "修复", "错误",
            ],
            TaskType::Research => &[
                "search",
                "find",
                "research",
                "study",
                "investigate",
                "研究",
                "查找",
                "了解",
            ],
            TaskType::Exploration => &[],
        }
    }
}

/// Classifies the conversation by counting distinct indicator phrases per
/// task type. No indicator at all means open-ended exploration.
pub fn detect_task_type<S: AsRef<str>>(messages: &[S]) -> TaskType {
    let text = messages
        .iter()
        .map(|message| message.as_ref().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let mut best = TaskType::Exploration;
    let mut best_count = 0;
    for task in TASK_PRIORITY {
        let count = task
            .indicators()
            .iter()
            .filter(|indicator| text.contains(*indicator))
            .count();
        if count > best_count {
            best = task;
            best_count = count;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frustration_and_stuck_keywords_add_up() {
        assert_eq!(emotion_score("Same TypeError again"), 7);
        assert_eq!(emotion_score("it still not works"), 3);
        assert_eq!(emotion_score("为什么还是一样的"), 7);
    }

    #[test]
    fn ordinary_follow_ups_are_neutral() {
        assert_eq!(emotion_score("Can you do the same for the Python version?"), 0);
        assert_eq!(emotion_score("Is this the same as a HashMap?"), 0);
        assert_eq!(emotion_score("Run it again with verbose logging"), 0);
    }

    #[test]
    fn repeated_failure_phrases_count() {
        assert_eq!(emotion_score("the build failed again"), 3);
        assert_eq!(emotion_score("same exception as before"), 4);
        assert_eq!(emotion_score("same error"), 7);
    }

    #[test]
    fn exploration_and_refinement_are_negative() {
        assert_eq!(emotion_score("Try a different approach"), -2);
        assert_eq!(emotion_score("optimize and simplify this"), -2);
        assert_eq!(emotion_score("Explain recursion"), 0);
    }

    #[test]
    fn task_type_counts_distinct_indicators() {
        assert_eq!(
            detect_task_type(&["There is a bug, please fix this problem"]),
            TaskType::Debugging
        );
        assert_eq!(
            detect_task_type(&["help me write a draft"]),
            TaskType::Writing
        );
        assert_eq!(
            detect_task_type(&["research and investigate this"]),
            TaskType::Research
        );
    }

    #[test]
    fn task_type_ties_follow_declared_order() {
        // "error" counts once for coding and once for debugging.
        assert_eq!(detect_task_type(&["an error"]), TaskType::Coding);
    }

    #[test]
    fn no_indicator_means_exploration() {
        assert_eq!(detect_task_type(&["Explain recursion"]), TaskType::Exploration);
        assert_eq!(detect_task_type::<&str>(&[]), TaskType::Exploration);
        assert_eq!(TaskType::Exploration.allowed_iterations(), 5);
    }

    #[test]
    fn debug_keywords_are_case_insensitive() {
        assert!(contains_debug_keyword("Same TypeError again"));
        assert!(contains_debug_keyword("请帮我修复"));
        assert!(!contains_debug_keyword("Explain recursion"));
    }
}
