//! Output template blocks and the final text renderer.
//!
//! A template is an ordered block list: literal text, one category's draw,
//! or a whole group. Text blocks are connective tissue ("and", ", with a")
//! and are elided when the content they join is absent, so toggling an
//! optional category off never leaves a dangling separator.

use crate::catalog;
use crate::roll::PoolState;
use content_api::{BlockKind, Category, OutputBlock, OutputConfig};
use uuid::Uuid;

/// Fallback template: one block per category, in sort order.
pub fn default_category_blocks(categories: &[Category]) -> Vec<OutputBlock> {
    catalog::sorted(categories)
        .into_iter()
        .map(|cat| OutputBlock {
            id: format!("cat-{}", cat.slug),
            kind: BlockKind::Category {
                category_slug: cat.slug.clone(),
            },
        })
        .collect()
}

/// One block per distinct normalized group id, in first-appearance order.
pub fn default_group_blocks(categories: &[Category]) -> Vec<OutputBlock> {
    let mut group_ids: Vec<&str> = Vec::new();
    for cat in catalog::sorted(categories) {
        let id = catalog::normalized_group_id(cat);
        if !group_ids.contains(&id) {
            group_ids.push(id);
        }
    }
    group_ids
        .into_iter()
        .map(|group_id| OutputBlock {
            id: format!("group-{group_id}"),
            kind: BlockKind::Group {
                group_id: group_id.to_string(),
            },
        })
        .collect()
}

/// Serialize blocks into the `{{cat:slug}}` / `{{group:id}}` template form.
pub fn blocks_to_template(blocks: &[OutputBlock]) -> String {
    let mut template = String::new();
    for (index, block) in blocks.iter().enumerate() {
        match &block.kind {
            BlockKind::Text { text } => template.push_str(text),
            BlockKind::Category { category_slug } => {
                push_token(&mut template, blocks, index, &format!("{{{{cat:{category_slug}}}}}"));
            }
            BlockKind::Group { group_id } => {
                push_token(&mut template, blocks, index, &format!("{{{{group:{group_id}}}}}"));
            }
        }
    }
    template
}

fn push_token(template: &mut String, blocks: &[OutputBlock], index: usize, token: &str) {
    if !template.is_empty() {
        if let Some(prev) = index.checked_sub(1).and_then(|i| blocks.get(i)) {
            if !matches!(prev.kind, BlockKind::Text { .. }) {
                template.push(' ');
            }
        }
    }
    template.push_str(token);
}

/// Parse a template back into blocks. Unrecognized `{{...}}` runs stay
/// literal text; empty token values are consumed silently.
pub fn template_to_blocks(template: &str) -> Vec<OutputBlock> {
    let mut blocks: Vec<OutputBlock> = Vec::new();
    let mut text = String::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            break;
        };
        let inner = &after_open[..close];

        match parse_token(inner) {
            Some(kind) => {
                text.push_str(&rest[..open]);
                flush_text(&mut blocks, &mut text);
                if let Some(kind) = kind {
                    blocks.push(OutputBlock {
                        id: Uuid::new_v4().to_string(),
                        kind,
                    });
                }
            }
            None => {
                // Not a token: keep the braces as literal text.
                text.push_str(&rest[..open + 2 + close + 2]);
            }
        }
        rest = &after_open[close + 2..];
    }

    text.push_str(rest);
    flush_text(&mut blocks, &mut text);
    blocks
}

/// `Some(Some(kind))` for a valid token, `Some(None)` for a recognized but
/// empty token (consumed without output), `None` for a non-token.
#[allow(clippy::option_option)]
fn parse_token(inner: &str) -> Option<Option<BlockKind>> {
    let (kind, value) = inner.split_once(':')?;
    let value = value.trim();
    match kind.trim() {
        "cat" => Some((!value.is_empty()).then(|| BlockKind::Category {
            category_slug: value.to_string(),
        })),
        "group" => Some((!value.is_empty()).then(|| BlockKind::Group {
            group_id: value.to_string(),
        })),
        _ => None,
    }
}

fn flush_text(blocks: &mut Vec<OutputBlock>, text: &mut String) {
    if text.is_empty() {
        return;
    }
    blocks.push(OutputBlock {
        id: Uuid::new_v4().to_string(),
        kind: BlockKind::Text {
            text: std::mem::take(text),
        },
    });
}

// ============================================================================
// Rendering
// ============================================================================

enum Resolved {
    Text(String),
    Content(String),
}

/// Render the current draws through the active output config (or the
/// default per-category template) into the final text.
///
/// Pure: the same inputs always produce the same string.
pub fn render(
    categories: &[Category],
    state: &PoolState,
    configs: &[OutputConfig],
    active_config_id: Option<&str>,
) -> String {
    let active_blocks = active_config_id
        .and_then(|id| configs.iter().find(|config| config.id == id))
        .map(|config| config.blocks.as_slice())
        .unwrap_or(&[]);

    let default_blocks;
    let blocks: &[OutputBlock] = if active_blocks.is_empty() {
        default_blocks = default_category_blocks(categories);
        &default_blocks
    } else {
        active_blocks
    };

    let resolved: Vec<Resolved> = blocks
        .iter()
        .map(|block| match &block.kind {
            BlockKind::Text { text } => Resolved::Text(text.clone()),
            BlockKind::Category { category_slug } => {
                Resolved::Content(category_segment(categories, state, category_slug))
            }
            BlockKind::Group { group_id } => {
                Resolved::Content(group_segment(categories, state, group_id))
            }
        })
        .collect();

    let mut output = String::new();
    let mut last_was_content = false;
    let mut emitted_content = false;

    for (index, segment) in resolved.iter().enumerate() {
        match segment {
            Resolved::Content(value) => {
                if value.trim().is_empty() {
                    continue;
                }
                if last_was_content
                    && !output.is_empty()
                    && !output.ends_with(char::is_whitespace)
                {
                    output.push(' ');
                }
                output.push_str(value);
                last_was_content = true;
                emitted_content = true;
            }
            Resolved::Text(value) => {
                // A separator survives only next to content that actually
                // rendered: judged against the last emitted content on the
                // left and the nearest content block on the right.
                let next_has = resolved[index + 1..]
                    .iter()
                    .find_map(|candidate| match candidate {
                        Resolved::Content(next) => Some(!next.trim().is_empty()),
                        Resolved::Text(_) => None,
                    });
                let keep = next_has.unwrap_or(emitted_content);
                if keep && !value.is_empty() {
                    output.push_str(value);
                    last_was_content = false;
                }
            }
        }
    }

    output.trim().to_string()
}

fn category_segment(categories: &[Category], state: &PoolState, slug: &str) -> String {
    if catalog::find(categories, slug).is_none() {
        return String::new();
    }
    if !state.is_checked(slug) && !state.is_card_locked(slug) {
        return String::new();
    }
    let values: Vec<&str> = state
        .draw(slug)
        .iter()
        .map(|item| item.value.as_str())
        .collect();
    values.join(", ")
}

fn group_segment(categories: &[Category], state: &PoolState, group_id: &str) -> String {
    let normalized = if catalog::is_general_group(group_id) {
        catalog::GENERAL_GROUP
    } else {
        group_id
    };
    let segments: Vec<String> = catalog::sorted(categories)
        .into_iter()
        .filter(|cat| catalog::normalized_group_id(cat) == normalized)
        .map(|cat| category_segment(categories, state, &cat.slug))
        .filter(|segment| !segment.is_empty())
        .collect();
    segments.join(", ")
}
