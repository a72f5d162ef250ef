//! Prompt assembly.
//!
//! Builds the single prompt string sent to the completion service from the
//! matching policy, the listing catalog, the session transcript and the new
//! tenant utterance. Assembly is pure: same inputs, same prompt.

use leasa_core::types::{Listing, Turn};

/// Matching rules given to the model ahead of every prompt.
pub const DEFAULT_POLICY: &str = "\
You are Leasa, an AI real estate agent helping a tenant find a rental that fits both \
their needs and the landlord's requirements.

MATCHING RULES:
1. Location comes first. Use the full addresses below together with your own knowledge \
of neighborhoods, landmarks, commute times and distances to judge how well a property \
fits the areas the tenant asks about.
2. Landlord specifications are hard constraints. Never recommend a property whose \
landlord specifications the tenant does not meet, and never suggest working around them.
3. Price and amenities are negotiable. You may suggest a property that misses the \
tenant's budget or amenity wishes, but you must say exactly where it falls short.
4. Only recommend properties from the AVAILABLE PROPERTIES list. Never invent a property.
5. If nothing matches, say so, explain why, and offer the closest alternatives.
6. Cite every property you recommend with this exact marker: [PROPERTY_ID: <id>]
7. Ask for missing preferences (area, budget, move-in date, household) before recommending.
";

const NO_LISTINGS_MARKER: &str =
    "AVAILABLE PROPERTIES: No properties are currently available. Do not recommend any property.\n";

/// Prompt builder with an optional size budget.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    policy: String,
    /// Character budget for the whole prompt; 0 means unlimited.
    max_prompt_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_POLICY, 0)
    }
}

impl ContextAssembler {
    pub fn new(policy: impl Into<String>, max_prompt_chars: usize) -> Self {
        Self {
            policy: policy.into(),
            max_prompt_chars,
        }
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Build the prompt for one turn.
    ///
    /// `transcript` must not already contain `utterance`; the utterance goes
    /// into the dedicated current-query block. When the prompt would exceed
    /// the budget, the oldest transcript turns are omitted first. The
    /// catalog is never truncated.
    pub fn assemble(&self, catalog: &[Listing], transcript: &[Turn], utterance: &str) -> String {
        let head = format!("{}\n{}", self.policy, render_catalog(catalog));
        let query = render_query(utterance);
        let lines: Vec<String> = transcript.iter().map(render_turn).collect();

        let start = self.first_kept_turn(char_len(&head) + char_len(&query), &lines);
        if start > 0 {
            tracing::debug!(
                omitted_turns = start,
                kept_turns = lines.len() - start,
                "Prompt over budget; dropping oldest turns"
            );
        }

        let mut prompt = head;
        prompt.push_str(&render_history(&lines[start..], start));
        prompt.push_str(&query);
        prompt
    }

    /// Index of the oldest turn that still fits the budget.
    fn first_kept_turn(&self, fixed_len: usize, lines: &[String]) -> usize {
        if self.max_prompt_chars == 0 {
            return 0;
        }
        let line_lens: Vec<usize> = lines.iter().map(|l| char_len(l)).collect();
        let mut kept_chars: usize = line_lens.iter().sum();
        let mut start = 0;
        while start < lines.len() {
            let needed = fixed_len + history_len(lines.len() - start, start, kept_chars);
            if needed <= self.max_prompt_chars {
                break;
            }
            kept_chars -= line_lens[start];
            start += 1;
        }
        start
    }
}

/// Build a prompt with no size budget.
pub fn assemble(policy_text: &str, catalog: &[Listing], transcript: &[Turn], utterance: &str) -> String {
    ContextAssembler::new(policy_text, 0).assemble(catalog, transcript, utterance)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Collapse embedded line breaks so each listing field stays on one line.
fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_catalog(catalog: &[Listing]) -> String {
    if catalog.is_empty() {
        return format!("{}\n", NO_LISTINGS_MARKER);
    }
    let mut out = String::from("AVAILABLE PROPERTIES:\n");
    for listing in catalog {
        out.push_str(&format!("Property ID: {}\n", one_line(&listing.id)));
        out.push_str(&format!("Address: {}\n", one_line(&listing.address)));
        if let Some(price) = listing.price {
            out.push_str(&format!("Price: {}\n", price));
        }
        out.push_str(&format!("Description: {}\n", one_line(&listing.description)));
        out.push_str(&format!(
            "Landlord specifications: {}\n\n",
            one_line(&listing.specifications)
        ));
    }
    out
}

fn render_turn(turn: &Turn) -> String {
    format!("{}: {}\n", turn.role.label(), turn.content)
}

const HISTORY_HEADER: &str = "CONVERSATION HISTORY:\n";

fn omitted_note(omitted: usize) -> String {
    format!("({} earlier messages omitted)\n", omitted)
}

/// Length of [`render_history`] output without building it.
fn history_len(kept: usize, omitted: usize, kept_chars: usize) -> usize {
    if kept == 0 && omitted == 0 {
        return 0;
    }
    let note = if omitted > 0 {
        char_len(&omitted_note(omitted))
    } else {
        0
    };
    char_len(HISTORY_HEADER) + note + kept_chars
}

fn render_history(lines: &[String], omitted: usize) -> String {
    if lines.is_empty() && omitted == 0 {
        return String::new();
    }
    let mut out = String::from(HISTORY_HEADER);
    if omitted > 0 {
        out.push_str(&omitted_note(omitted));
    }
    for line in lines {
        out.push_str(line);
    }
    out
}

fn render_query(utterance: &str) -> String {
    format!("\nCURRENT QUERY:\nTenant: {}\n", utterance)
}
