//! Postprocessors run over the raw completion text, in a fixed order:
//! chain-of-thought stripping, then context-specific indicator stripping,
//! overlap removal, whitespace trimming, and finally the terminal guardrail
//! check.

mod cot;
mod guardrails;
mod indicators;
mod overlap;
mod whitespace;

pub use cot::ChainOfThoughtStripper;
pub use guardrails::check as guardrails;
pub use indicators::{RemoveCodeIndicators, RemoveMathIndicators};
pub use overlap::RemoveOverlap;
pub use whitespace::RemoveWhitespace;

use crate::error::Result;
use crate::types::ContextClass;

/// Run the full fixed pipeline over `completion`, returning an error if the
/// guardrail check rejects the result.
pub fn apply(
    cot: &ChainOfThoughtStripper,
    prefix: &str,
    suffix: &str,
    context: ContextClass,
    completion: String,
) -> Result<String> {
    let mut text = cot.process(completion);
    text = RemoveMathIndicators.process(context, text);
    text = RemoveCodeIndicators.process(context, text);
    text = RemoveOverlap.process(prefix, suffix, text);
    text = RemoveWhitespace.process(prefix, suffix, context, text);
    guardrails(text)
}
