use crate::element::Element;

/// Fallback distance from the source when a beamline is empty and the
/// session carries no configured source distance.
pub const DEFAULT_SOURCE_DISTANCE: f64 = 20.0;

/// Position for an element appended at the end of the sequence.
pub fn append_position(elements: &[Element], source_distance: Option<f64>) -> f64 {
    match elements.last() {
        Some(last) => last.position + 1.0,
        None => source_distance.unwrap_or(DEFAULT_SOURCE_DISTANCE),
    }
}

/// Position for an element that has already been placed at `index`,
/// derived from its immediate neighbors. Unaffected elements never move,
/// so positions grow dense near frequently edited regions; there is no
/// renumbering pass. Callers skip this for singleton sequences.
pub fn placed_position(elements: &[Element], index: usize) -> f64 {
    debug_assert!(elements.len() > 1);
    if index == 0 {
        elements[1].position - 0.5
    } else if index == elements.len() - 1 {
        elements[index].position + 0.5
    } else {
        round2((elements[index - 1].position + elements[index + 1].position) / 2.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementId;

    fn item(id: u64, position: f64) -> Element {
        Element {
            id: Some(ElementId(id)),
            element_type: "lens".to_string(),
            title: "Lens".to_string(),
            position,
            is_disabled: None,
            fields: Default::default(),
        }
    }

    #[test]
    fn test_append_empty_uses_source_distance() {
        assert_eq!(append_position(&[], Some(31.5)), 31.5);
        assert_eq!(append_position(&[], None), DEFAULT_SOURCE_DISTANCE);
    }

    #[test]
    fn test_append_after_last() {
        let elements = vec![item(1, 10.0), item(2, 17.25)];
        assert_eq!(append_position(&elements, None), 18.25);
    }

    #[test]
    fn test_placed_at_front_is_strictly_less() {
        let elements = vec![item(3, 0.0), item(1, 10.0), item(2, 20.0)];
        assert_eq!(placed_position(&elements, 0), 9.5);
    }

    #[test]
    fn test_placed_at_end_adds_half() {
        // the element at the last index keeps its own position as the base
        let elements = vec![item(1, 10.0), item(2, 20.0), item(3, 21.0)];
        assert_eq!(placed_position(&elements, 2), 21.5);
    }

    #[test]
    fn test_placed_between_is_rounded_mean() {
        let elements = vec![item(1, 10.0), item(3, 0.0), item(2, 20.0)];
        assert_eq!(placed_position(&elements, 1), 15.0);

        let elements = vec![item(1, 10.0), item(3, 0.0), item(2, 10.11)];
        assert_eq!(placed_position(&elements, 1), 10.06);
    }
}
