use clockrun_core::{Column, JumpProfile};

/// Tests whether the player can jump between columns `a` and `b` of `columns`.
///
/// The jump is modelled as a parabola of apex `max_jump_height` spanning the
/// pixel distance between the two columns, laid over a baseline that rises
/// linearly from one landing height to the other. Every column strictly
/// between the endpoints has to stay at or below the reachable height.
/// Endpoints are ordered left to right first, so the answer does not depend
/// on the direction of the jump.
#[must_use]
pub fn is_jump_possible(columns: &[Column], a: usize, b: usize, jump: &JumpProfile) -> bool {
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    let (Some(from), Some(to)) = (columns.get(start), columns.get(end)) else {
        return false;
    };
    if start == end {
        return true;
    }
    let from_height = f64::from(from.obstacle_height());
    let to_height = f64::from(to.obstacle_height());
    if from.obstacle_height().abs_diff(to.obstacle_height()) > jump.max_block_jump_height() {
        return false;
    }

    let tile = jump.tile_pixel_width();
    let blocks = end - start;
    let d = blocks as f64 * tile;
    if d > jump.max_jump_distance() {
        return false;
    }
    let k = -4.0 * jump.max_jump_height() / (d * d);

    for step in 1..blocks {
        let x = step as f64 * tile;
        let y = k * x * (x - d);
        let baseline = from_height + (to_height - from_height) * step as f64 / blocks as f64;
        let reachable = baseline + (y / tile).floor();
        if f64::from(columns[start + step].obstacle_height()) > reachable {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(heights: &[i32]) -> Vec<Column> {
        heights.iter().map(|height| Column::new(*height)).collect()
    }

    #[test]
    fn same_column_is_always_reachable() {
        let columns = flat(&[3]);
        assert!(is_jump_possible(&columns, 0, 0, &JumpProfile::default()));
    }

    #[test]
    fn clears_low_obstacles_between_platforms() {
        let jump = JumpProfile::default();
        let columns = flat(&[3, 0, 0, 4, 0, 3]);
        assert!(is_jump_possible(&columns, 0, 5, &jump));
    }

    #[test]
    fn blocked_by_a_tall_wall() {
        let jump = JumpProfile::default();
        let columns = flat(&[3, 9, 3]);
        assert!(!is_jump_possible(&columns, 0, 2, &jump));
        assert!(!is_jump_possible(&columns, 2, 0, &jump));
    }

    #[test]
    fn landing_heights_must_be_within_reach() {
        let jump = JumpProfile::default();
        let columns = flat(&[1, 0, 6]);
        assert!(!is_jump_possible(&columns, 0, 2, &jump));
        let columns = flat(&[4, 0, 6]);
        assert!(is_jump_possible(&columns, 0, 2, &jump));
    }

    #[test]
    fn distance_beyond_airtime_is_unreachable() {
        let jump = JumpProfile::default();
        let mut columns = vec![Column::new(3)];
        columns.extend(std::iter::repeat(Column::new(0)).take(12));
        columns.push(Column::new(3));
        assert!(!is_jump_possible(&columns, 0, 13, &jump));
    }

    #[test]
    fn spikes_count_toward_obstacle_height() {
        let jump = JumpProfile::default();
        let bare = flat(&[2, 4, 2]);
        assert!(is_jump_possible(&bare, 0, 2, &jump));
        let spiked = vec![
            Column::new(2),
            Column::new(4).with_spike(true),
            Column::new(2),
        ];
        assert!(!is_jump_possible(&spiked, 0, 2, &jump));
    }

    #[test]
    fn feasibility_is_direction_symmetric() {
        let jump = JumpProfile::default();
        let columns = flat(&[2, 3, 0, 5, 4, 1, 0, 0, 3, 4, 2, 6, 5]);
        for a in 0..columns.len() {
            for b in 0..columns.len() {
                assert_eq!(
                    is_jump_possible(&columns, a, b, &jump),
                    is_jump_possible(&columns, b, a, &jump),
                    "jump {a} <-> {b}"
                );
            }
        }
    }
}
