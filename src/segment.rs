use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::model::{BlockKind, PageContent, TextBlock};

const HEADING_MAX_CHARS: usize = 100;
const SHORT_CAPITALIZED_MAX_CHARS: usize = 50;
const INDENT_BONUS_MIN_COLUMNS: usize = 5;
const SECTION_KEYWORDS: [&str; 5] = ["장", "절", "부", "팀", "담당"];

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").expect("numbered heading regex is valid"));

struct HeadingRule {
    matches: fn(&str) -> bool,
    level: usize,
}

/// Evaluated top-down; the first matching rule decides the heading level.
const HEADING_RULES: [HeadingRule; 3] = [
    HeadingRule {
        matches: is_numbered,
        level: 2,
    },
    HeadingRule {
        matches: is_case_heading,
        level: 1,
    },
    HeadingRule {
        matches: has_section_keyword,
        level: 2,
    },
];

struct ListRule {
    pattern: &'static str,
    depth: usize,
}

const LIST_RULES: [ListRule; 5] = [
    ListRule {
        pattern: r"^[○●▪▫•·]\s+",
        depth: 1,
    },
    ListRule {
        pattern: r"^[-*+]\s+",
        depth: 1,
    },
    ListRule {
        pattern: r"^\d+[.)]\s+",
        depth: 1,
    },
    ListRule {
        pattern: r"^[가-하][.)]\s+",
        depth: 2,
    },
    ListRule {
        pattern: r"^[a-z][.)]\s+",
        depth: 2,
    },
];

static LIST_PATTERNS: LazyLock<Vec<(Regex, usize)>> = LazyLock::new(|| {
    LIST_RULES
        .iter()
        .map(|rule| {
            (
                Regex::new(rule.pattern).expect("list item regex is valid"),
                rule.depth,
            )
        })
        .collect()
});

fn is_numbered(text: &str) -> bool {
    NUMBERED.is_match(text)
}

fn is_case_heading(text: &str) -> bool {
    is_all_uppercase(text) || is_short_capitalized(text)
}

fn has_section_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    SECTION_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

fn is_all_uppercase(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

fn is_short_capitalized(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
        && text.chars().count() < SHORT_CAPITALIZED_MAX_CHARS
}

/// Classifies one paragraph candidate. Leading whitespace is only used for
/// the list indentation bonus.
#[must_use]
pub fn classify_block(raw: &str) -> (BlockKind, usize) {
    let body = raw.trim_start();
    let indent = raw.chars().count() - body.chars().count();

    if body.chars().count() < HEADING_MAX_CHARS {
        if let Some(rule) = HEADING_RULES.iter().find(|rule| (rule.matches)(body)) {
            return (BlockKind::Heading, rule.level);
        }
    }

    let list_depth = LIST_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(body))
        .map(|(_, depth)| *depth);
    let indent_bonus = usize::from(indent >= INDENT_BONUS_MIN_COLUMNS);

    match list_depth {
        Some(depth) => (BlockKind::ListItem, depth + indent_bonus),
        None => (BlockKind::Paragraph, 0),
    }
}

/// Joins consecutive non-blank lines into paragraph candidates. The first
/// line keeps its indentation.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
            continue;
        }

        if current.is_empty() {
            current.push(line.trim_end());
        } else {
            current.push(line.trim());
        }
    }

    if !current.is_empty() {
        out.push(current.join(" "));
    }

    out
}

pub(crate) fn segment_text(text: &str, page: u32) -> Vec<TextBlock> {
    paragraphs(text)
        .into_iter()
        .map(|paragraph| {
            let (kind, level) = classify_block(&paragraph);
            TextBlock {
                text: paragraph.trim().to_string(),
                kind,
                level,
                page,
            }
        })
        .collect()
}

#[must_use]
pub fn segment_page(page: &PageContent) -> Vec<TextBlock> {
    trace!(
        page = page.page_number,
        avg_font_size = page.avg_font_size,
        "segmenting page text"
    );
    segment_text(&page.text, page.page_number)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{classify_block, segment_text};
    use crate::model::BlockKind;

    #[test]
    fn numbered_line_is_level_two_heading() {
        assert_eq!(classify_block("1. Introduction"), (BlockKind::Heading, 2));
        assert_eq!(classify_block("3) Scope"), (BlockKind::Heading, 2));
    }

    #[test]
    fn indentation_bonus_needs_five_columns() {
        assert_eq!(classify_block("   - item"), (BlockKind::ListItem, 1));
        assert_eq!(classify_block("    - item"), (BlockKind::ListItem, 1));
        assert_eq!(classify_block("     - item"), (BlockKind::ListItem, 2));
    }

    #[test]
    fn case_based_headings_are_level_one() {
        assert_eq!(classify_block("ANNUAL REPORT 2024"), (BlockKind::Heading, 1));
        assert_eq!(classify_block("Overview"), (BlockKind::Heading, 1));
    }

    #[test]
    fn organisational_keywords_make_level_two_headings() {
        assert_eq!(classify_block("총무팀 업무 분장"), (BlockKind::Heading, 2));
        assert_eq!(classify_block("제1장 총칙"), (BlockKind::Heading, 2));
    }

    #[test]
    fn long_text_is_never_a_heading() {
        let long = format!("Revenue grew {}", "steadily ".repeat(12));
        assert!(long.chars().count() >= 100);
        assert_eq!(classify_block(&long), (BlockKind::Paragraph, 0));

        let numbered_long = format!("1. {long}");
        assert_eq!(classify_block(&numbered_long), (BlockKind::ListItem, 1));
    }

    #[test]
    fn list_patterns_apply_in_order() {
        assert_eq!(classify_block("• bullet point"), (BlockKind::ListItem, 1));
        assert_eq!(classify_block("* starred"), (BlockKind::ListItem, 1));
        assert_eq!(classify_block("가. 첫째 항목"), (BlockKind::ListItem, 2));
        assert_eq!(classify_block("b) second option"), (BlockKind::ListItem, 2));
        assert_eq!(
            classify_block("      a. nested letter"),
            (BlockKind::ListItem, 3)
        );
    }

    #[test]
    fn lowercase_sentences_are_paragraphs() {
        assert_eq!(
            classify_block("the committee met twice this quarter."),
            (BlockKind::Paragraph, 0)
        );
    }

    #[test]
    fn blank_lines_delimit_paragraphs() {
        let text = "INTRODUCTION\n\nthe plan covers\ntwo phases.\n\n\n- first phase\n";
        let blocks = segment_text(text, 4);

        let summary = blocks
            .iter()
            .map(|block| (block.kind, block.level, block.text.as_str(), block.page))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (BlockKind::Heading, 1, "INTRODUCTION", 4),
                (BlockKind::Paragraph, 0, "the plan covers two phases.", 4),
                (BlockKind::ListItem, 1, "- first phase", 4),
            ]
        );
    }

    #[test]
    fn indentation_of_first_line_survives_joining() {
        let blocks = segment_text("      - nested\n  continues here", 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::ListItem);
        assert_eq!(blocks[0].level, 2);
        assert_eq!(blocks[0].text, "- nested continues here");
    }

    #[test]
    fn empty_text_yields_no_blocks() {
        assert!(segment_text("\n  \n\t\n", 1).is_empty());
    }
}
