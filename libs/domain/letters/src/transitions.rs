use openpenpal_models::letter::BarcodeStatus;

/// Explicit allowed-transition table (spec §4.6/§3): `Unactivated →
/// Bound → InTransit → Delivered`, any non-terminal state may move to
/// `Cancelled`, and any state may move to `Expired` by wall clock. A
/// letter being marked read advances `LetterStatus` only — the barcode
/// itself has no `Read` state and stays at `Delivered`. Anything else
/// fails with `InvalidTransition` and leaves state untouched. `Bind` is a
/// distinct operation from `UpdateBarcodeStatus`, but both funnel through
/// this table so there is exactly one source of truth for validity.
pub fn is_allowed(from: BarcodeStatus, to: BarcodeStatus) -> bool {
    use BarcodeStatus::*;
    if to == Expired {
        return from != Expired;
    }
    matches!(
        (from, to),
        (Unactivated, Bound)
            | (Unactivated, Cancelled)
            | (Bound, InTransit)
            | (Bound, Cancelled)
            | (InTransit, Delivered)
            | (InTransit, Cancelled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use BarcodeStatus::*;

    #[test]
    fn happy_path_is_allowed() {
        assert!(is_allowed(Unactivated, Bound));
        assert!(is_allowed(Bound, InTransit));
        assert!(is_allowed(InTransit, Delivered));
    }

    #[test]
    fn terminal_states_reject_everything() {
        assert!(!is_allowed(Delivered, Bound));
        assert!(!is_allowed(Cancelled, Bound));
        assert!(!is_allowed(Expired, Bound));
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        assert!(!is_allowed(Unactivated, Delivered));
        assert!(!is_allowed(Bound, Delivered));
    }
}
