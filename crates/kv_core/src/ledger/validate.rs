use super::ConsistencyLedger;
use crate::error::ConsistencyError;
use crate::grammar::{to_file_name, FileIdentity};
use crate::schema::SchemaModel;
use tracing::debug;

/// Checks a parsed identity against the study's limits and the participant's locks.
/// Never mutates; a failure leaves the ledger exactly as it was.
pub fn validate_against_study(
    identity: &FileIdentity,
    schema: &SchemaModel,
    ledger: &ConsistencyLedger,
) -> Result<(), ConsistencyError> {
    let found = identity.selections().len();
    if found != schema.axis_count() || found != ledger.axis_count() {
        return Err(ConsistencyError::ShapeMismatch { expected: schema.axis_count(), found });
    }

    let participant = identity.participant_id();
    if !ledger.has_participant(participant)
        && ledger.participant_count() >= schema.max_participants() as usize
    {
        debug!(participant, limit = schema.max_participants(), "rejected: participant limit");
        return Err(ConsistencyError::ParticipantLimitExceeded {
            participant: participant.to_string(),
            limit: schema.max_participants(),
        });
    }

    if identity.attempt() > schema.max_attempts() {
        return Err(ConsistencyError::AttemptLimitExceeded {
            attempt: identity.attempt(),
            limit: schema.max_attempts(),
        });
    }

    for (axis_index, axis) in schema.axes().iter().enumerate() {
        if !axis.is_fixed() {
            continue;
        }
        let Some(locked) = ledger.locked_selection(participant, axis_index) else {
            continue;
        };
        // Absent is always compatible with a lock
        if let Some(attempted) = identity.selections()[axis_index].values().first() {
            if attempted != locked {
                debug!(
                    participant,
                    axis = axis.name(),
                    locked,
                    attempted = %attempted,
                    "rejected: fixed axis"
                );
                return Err(ConsistencyError::FixedAxisMismatch {
                    axis: axis.name().to_string(),
                    locked: locked.to_string(),
                    attempted: attempted.clone(),
                });
            }
        }
    }

    if ledger.contains(identity) {
        return Err(ConsistencyError::DuplicateIdentity {
            file_name: to_file_name(identity, schema),
        });
    }

    Ok(())
}
