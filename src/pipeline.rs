//! Message text in, rendered message out.

use crate::config::ResolverConfig;
use crate::declaration::BattleDeclaration;
use crate::dex::Dex;
use crate::errors::PipelineResult;
use crate::extract::{contains_tag, extract_declaration};
use crate::payload::{render_message, BattlePayload, PayloadAssembler};
use crate::player::StoredPlayer;
use crate::resolver::Resolver;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoDeclaration,
    AlreadyRendered,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Rendered {
        message: String,
        payload: Box<BattlePayload>,
    },
    Skipped(SkipReason),
}

/// Everything the pipeline reads besides the message itself.
#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub dex: &'a Dex,
    pub config: &'a ResolverConfig,
    pub stored: &'a StoredPlayer,
    pub world_state: Option<&'a Value>,
}

/// Runs extraction, parsing, resolution and assembly. Either a complete
/// payload comes out or an error; nothing partial.
pub fn process_message<R: Rng + ?Sized>(
    text: &str,
    inputs: PipelineInputs<'_>,
    rng: &mut R,
) -> PipelineResult<MessageOutcome> {
    let tags = &inputs.config.tags;
    if contains_tag(text, &tags.payload) {
        debug!("message already carries a payload");
        return Ok(MessageOutcome::Skipped(SkipReason::AlreadyRendered));
    }
    if !contains_tag(text, &tags.declaration) {
        return Ok(MessageOutcome::Skipped(SkipReason::NoDeclaration));
    }

    let raw = extract_declaration(text, &tags.declaration)?;
    let declaration = BattleDeclaration::parse(&raw, &inputs.config.identity)?;
    let battle = Resolver::new(inputs.dex, inputs.config, inputs.stored).resolve(&declaration, rng)?;
    let payload = PayloadAssembler::new(inputs.config).assemble(
        &declaration,
        &battle,
        inputs.stored,
        inputs.world_state,
    );
    let message = render_message(text, &payload, &tags.payload)?;
    Ok(MessageOutcome::Rendered {
        message,
        payload: Box::new(payload),
    })
}
