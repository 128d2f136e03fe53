use mrlens_api::models::{MergeRequest, MergeRequestId};

/// Maps the previous selection onto a freshly fetched list. Falls back to the
/// first element when the previous merge request is gone.
pub fn reconcile<'a>(
    previous: Option<&MergeRequest>,
    new_list: &'a [MergeRequest],
) -> Option<&'a MergeRequest> {
    reconcile_id(previous.map(|mr| mr.id), new_list)
}

pub fn reconcile_id(
    previous: Option<MergeRequestId>,
    new_list: &[MergeRequest],
) -> Option<&MergeRequest> {
    previous
        .and_then(|id| new_list.iter().find(|mr| mr.id == id))
        .or_else(|| new_list.first())
}

#[cfg(test)]
mod test {
    use mrlens_api::models::Recommendation;

    use super::*;
    use crate::testing;

    #[test]
    fn test_no_previous_selects_first() {
        let list = testing::abc();

        assert_eq!(reconcile(None, &list).map(|m| m.id), Some(1));
    }

    #[test]
    fn test_empty_list_selects_nothing() {
        let prev = testing::mr(7, "2024-01-01");

        assert_eq!(reconcile(Some(&prev), &[]), None);
        assert_eq!(reconcile(None, &[]), None);
    }

    #[test]
    fn test_vanished_selection_falls_back_to_first() {
        let prev = testing::mr(7, "2024-01-01");
        let list = vec![testing::mr(3, "2024-01-01"), testing::mr(9, "2024-01-02")];

        assert_eq!(reconcile(Some(&prev), &list).map(|m| m.id), Some(3));
    }

    #[test]
    fn test_surviving_selection_resolves_to_new_object() {
        let prev = testing::mr(9, "2024-01-01");
        let list = vec![
            testing::mr(3, "2024-01-01"),
            testing::reviewed(
                testing::mr(9, "2024-01-02"),
                testing::review(Recommendation::NeedsFixes, 1),
            ),
        ];

        let selected = reconcile(Some(&prev), &list).expect("selection");

        assert_eq!(selected.id, 9);
        assert_eq!(selected.recommendation(), Some(Recommendation::NeedsFixes));
        assert!(std::ptr::eq(selected, &list[1]));
    }
}
