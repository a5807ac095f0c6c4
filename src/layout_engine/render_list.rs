/// Render pass holding the proxies.
pub const CAROUSEL_PASS: &str = "carousel";
/// Render pass dimming and blurring the desktop behind the carousel.
pub const BACKDROP_PASS: &str = "carousel-backdrop";

const ROW_WEIGHT: usize = 1000;

/// Back-to-front draw order for rows given as `(len, active_index)`.
///
/// Entries are ranked by `row_distance * 1000 + index_distance` from the
/// selection and emitted farthest first, so the selected entry is drawn last
/// and ends up on top. Ties keep row-major order.
pub fn render_order<I>(rows: I, active_row: usize) -> Vec<(usize, usize)>
where
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut ranked: Vec<(usize, (usize, usize))> = Vec::new();
    for (row, (len, active_index)) in rows.into_iter().enumerate() {
        let row_distance = row.abs_diff(active_row);
        for index in 0..len {
            let priority = row_distance * ROW_WEIGHT + index.abs_diff(active_index);
            ranked.push((priority, (row, index)));
        }
    }
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn selection_is_drawn_last() {
        let order = render_order([(5, 2)], 0);
        assert_eq!(order.last(), Some(&(0, 2)));
        assert_eq!(order, vec![(0, 0), (0, 4), (0, 1), (0, 3), (0, 2)]);
    }

    #[test]
    fn other_rows_go_first() {
        let order = render_order([(2, 0), (3, 1), (1, 0)], 1);
        assert_eq!(order, vec![(0, 1), (0, 0), (2, 0), (1, 0), (1, 2), (1, 1)]);
    }

    #[test]
    fn empty_rows_contribute_nothing() {
        assert!(render_order([(0, 0), (0, 0)], 0).is_empty());
    }
}
