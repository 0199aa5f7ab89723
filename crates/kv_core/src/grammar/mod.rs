//! File-name grammar
//!
//! `ParticipantId Slot_1 … Slot_k Attempt[_Suffix].ext`, space separated, one slot per
//! independent variable in schema order. A slot is either the reserved absent token
//! `Nulo` or one sub-value (several, joined by the separator, for multi-value
//! variables). All matching is case-sensitive.

pub mod identity;
pub mod stem;

pub use identity::{AxisSelection, FileIdentity};
pub use stem::file_stem;

use crate::error::NameError;
use crate::schema::{Axis, SchemaModel, ABSENT_TOKEN};
use tracing::debug;

/// Letters followed by digits, ASCII only (`P01`, `Sujeto007`).
pub fn is_valid_participant_id(token: &str) -> bool {
    let digits_start = token.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(token.len());
    let (letters, digits) = token.split_at(digits_start);
    !letters.is_empty() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn parse_attempt(token: &str) -> Result<u32, NameError> {
    let invalid = || NameError::InvalidAttemptToken { token: token.to_string() };
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    match token.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid()),
    }
}

fn unknown_piece(axis: &Axis, piece: &str) -> NameError {
    let suggestion = axis.case_insensitive_match(piece).map(str::to_string).or_else(|| {
        let looks_absent =
            piece != ABSENT_TOKEN && piece.to_lowercase() == ABSENT_TOKEN.to_lowercase();
        (looks_absent && !axis.is_mandatory()).then(|| ABSENT_TOKEN.to_string())
    });
    NameError::UnknownSubValue {
        axis: axis.name().to_string(),
        piece: piece.to_string(),
        suggestion,
    }
}

fn resolve_slot(axis: &Axis, slot: &str, separator: char) -> Result<AxisSelection, NameError> {
    if slot == ABSENT_TOKEN {
        if axis.is_mandatory() {
            return Err(NameError::InvalidAbsentForMandatoryAxis { axis: axis.name().to_string() });
        }
        return Ok(AxisSelection::Absent);
    }

    let pieces: Vec<&str> = slot.split(separator).collect();
    if !axis.allow_multiple() && pieces.len() > 1 {
        return Err(NameError::MultipleNotAllowed {
            axis: axis.name().to_string(),
            token: slot.to_string(),
        });
    }

    let mut positions = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let pos = axis.position_of(piece).ok_or_else(|| unknown_piece(axis, piece))?;
        if positions.contains(&pos) {
            return Err(NameError::DuplicateSubValue {
                axis: axis.name().to_string(),
                value: piece.to_string(),
            });
        }
        positions.push(pos);
    }

    // Canonical order, so `Der+Izq` and `Izq+Der` are the same identity
    positions.sort_unstable();
    Ok(AxisSelection::Values(positions.into_iter().map(|i| axis.sub_values()[i].clone()).collect()))
}

/// Parses a candidate file name against `schema`.
pub fn parse(file_name: &str, schema: &SchemaModel) -> Result<FileIdentity, NameError> {
    let stem = file_stem(file_name, schema.grammar());
    let tokens: Vec<&str> = stem.split_whitespace().collect();
    let axis_count = schema.axis_count();
    let expected = axis_count + 2;

    if tokens.len() != expected {
        debug!(file_name, found = tokens.len(), expected, "rejected: malformed structure");
        return Err(NameError::MalformedStructure {
            stem: stem.to_string(),
            expected,
            found: tokens.len(),
        });
    }

    let participant = tokens[0];
    if !is_valid_participant_id(participant) {
        return Err(NameError::InvalidParticipantId { token: participant.to_string() });
    }

    let separator = schema.separator();
    let selections = schema
        .axes()
        .iter()
        .zip(&tokens[1..=axis_count])
        .map(|(axis, slot)| resolve_slot(axis, slot, separator))
        .collect::<Result<Vec<_>, _>>()?;

    let attempt = parse_attempt(tokens[axis_count + 1])?;

    if selections.iter().all(AxisSelection::is_absent) {
        return Err(NameError::AllAxesAbsent);
    }

    debug!(file_name, participant, attempt, "file name parsed");
    Ok(FileIdentity::new(participant.to_string(), attempt, selections))
}

/// Canonical file name (without extension) for an identity: sub-values in definition
/// order, attempt zero-padded to two digits.
pub fn to_file_name(identity: &FileIdentity, schema: &SchemaModel) -> String {
    let separator = schema.separator();
    let mut parts = Vec::with_capacity(identity.selections().len() + 2);
    parts.push(identity.participant_id().to_string());
    parts.extend(identity.selections().iter().map(|s| s.render(separator)));
    parts.push(format!("{:02}", identity.attempt()));
    parts.join(" ")
}

/// Human-readable pattern shown next to rejections, e.g.
/// `ParticipantId <CMJ|SJ|Nulo> <PRE+POST> NN`.
pub fn expected_pattern(schema: &SchemaModel) -> String {
    let separator = schema.separator().to_string();
    let mut parts = vec!["ParticipantId".to_string()];
    for axis in schema.axes() {
        let joiner = if axis.allow_multiple() { separator.as_str() } else { "|" };
        let mut choices = axis.sub_values().join(joiner);
        if !axis.is_mandatory() {
            choices.push('|');
            choices.push_str(ABSENT_TOKEN);
        }
        parts.push(format!("<{}>", choices));
    }
    parts.push("NN".to_string());
    parts.join(" ")
}
