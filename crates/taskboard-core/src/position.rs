//! Position arithmetic for ordered containers (sections in a workspace,
//! tasks in a section).
//!
//! Every function takes the active items of one container as `(id, position)`
//! pairs and returns only the pairs whose position changes. The result always
//! leaves the container numbered `0..n-1`, so a container that drifted (gaps
//! or duplicates) is repaired by the next operation that touches it.

use uuid::Uuid;

/// Clamps a requested slot into `0..=len-1`.
pub fn clamp_target(target: i32, len: usize) -> i32 {
    if len == 0 {
        return 0;
    }
    target.clamp(0, len as i32 - 1)
}

fn ordered(items: &[(Uuid, i32)]) -> Vec<(Uuid, i32)> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    sorted
}

fn changes(original: &[(Uuid, i32)], order: &[Uuid]) -> Vec<(Uuid, i32)> {
    order
        .iter()
        .enumerate()
        .filter_map(|(slot, id)| {
            let slot = slot as i32;
            let before = original.iter().find(|(other, _)| other == id).map(|(_, p)| *p);
            (before != Some(slot)).then_some((*id, slot))
        })
        .collect()
}

/// Moves `id` to `target` (clamped). Items in between shift by one.
pub fn plan_move(items: &[(Uuid, i32)], id: Uuid, target: i32) -> Vec<(Uuid, i32)> {
    let mut order: Vec<Uuid> = ordered(items).into_iter().map(|(i, _)| i).collect();
    let Some(from) = order.iter().position(|i| *i == id) else {
        return Vec::new();
    };
    let to = clamp_target(target, order.len()) as usize;

    let moved = order.remove(from);
    order.insert(to, moved);

    changes(items, &order)
}

/// Removes `id` from the container; everything after it shifts down.
pub fn plan_removal(items: &[(Uuid, i32)], id: Uuid) -> Vec<(Uuid, i32)> {
    let order: Vec<Uuid> = ordered(items)
        .into_iter()
        .map(|(i, _)| i)
        .filter(|i| *i != id)
        .collect();

    changes(items, &order)
}

/// Opens a slot at `at` (clamped to `0..=len`) for a new item.
///
/// Returns the slot the new item takes and the shifts for existing items.
pub fn plan_insertion(items: &[(Uuid, i32)], id: Uuid, at: Option<i32>) -> (i32, Vec<(Uuid, i32)>) {
    let mut order: Vec<Uuid> = ordered(items)
        .into_iter()
        .map(|(i, _)| i)
        .filter(|i| *i != id)
        .collect();
    let slot = at.unwrap_or(order.len() as i32).clamp(0, order.len() as i32);

    order.insert(slot as usize, id);

    let shifts = changes(items, &order)
        .into_iter()
        .filter(|(i, _)| *i != id)
        .collect();
    (slot, shifts)
}

/// Renumbers the container to `0..n-1` ordered by (position, id).
pub fn normalize(items: &[(Uuid, i32)]) -> Vec<(Uuid, i32)> {
    let order: Vec<Uuid> = ordered(items).into_iter().map(|(i, _)| i).collect();
    changes(items, &order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        ids.sort();
        ids
    }

    fn contiguous(ids: &[Uuid]) -> Vec<(Uuid, i32)> {
        ids.iter().enumerate().map(|(i, id)| (*id, i as i32)).collect()
    }

    fn apply(items: &[(Uuid, i32)], changes: &[(Uuid, i32)]) -> Vec<(Uuid, i32)> {
        let mut out: Vec<(Uuid, i32)> = items
            .iter()
            .map(|(id, pos)| {
                let new = changes.iter().find(|(c, _)| c == id).map(|(_, p)| *p);
                (*id, new.unwrap_or(*pos))
            })
            .collect();
        out.sort_by_key(|(_, p)| *p);
        out
    }

    #[test]
    fn test_clamp_target() {
        assert_eq!(clamp_target(5, 0), 0);
        assert_eq!(clamp_target(-3, 4), 0);
        assert_eq!(clamp_target(9, 4), 3);
        assert_eq!(clamp_target(2, 4), 2);
    }

    #[test]
    fn test_move_down_shifts_between_up() {
        let ids = ids(5);
        let items = contiguous(&ids);

        let plan = plan_move(&items, ids[1], 3);
        assert_eq!(plan, vec![(ids[2], 1), (ids[3], 2), (ids[1], 3)]);
    }

    #[test]
    fn test_move_up_shifts_between_down() {
        let ids = ids(5);
        let items = contiguous(&ids);

        let plan = plan_move(&items, ids[4], 0);
        let result = apply(&items, &plan);
        let order: Vec<Uuid> = result.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![ids[4], ids[0], ids[1], ids[2], ids[3]]);
    }

    #[test]
    fn test_move_to_same_slot_is_noop() {
        let ids = ids(3);
        let items = contiguous(&ids);
        assert!(plan_move(&items, ids[1], 1).is_empty());
        assert!(plan_move(&items, Uuid::new_v4(), 0).is_empty());
    }

    #[test]
    fn test_removal_shifts_later_items_down() {
        let ids = ids(4);
        let items = contiguous(&ids);

        let plan = plan_removal(&items, ids[1]);
        assert_eq!(plan, vec![(ids[2], 1), (ids[3], 2)]);
    }

    #[test]
    fn test_insertion_appends_by_default() {
        let ids = ids(3);
        let items = contiguous(&ids);
        let (slot, shifts) = plan_insertion(&items, Uuid::new_v4(), None);
        assert_eq!(slot, 3);
        assert!(shifts.is_empty());
    }

    #[test]
    fn test_insertion_in_middle() {
        let ids = ids(3);
        let items = contiguous(&ids);
        let (slot, shifts) = plan_insertion(&items, Uuid::new_v4(), Some(1));
        assert_eq!(slot, 1);
        assert_eq!(shifts, vec![(ids[1], 2), (ids[2], 3)]);
    }

    #[test]
    fn test_normalize_repairs_gaps_and_duplicates() {
        let ids = ids(3);
        let items = vec![(ids[0], 4), (ids[1], 4), (ids[2], 9)];
        let plan = normalize(&items);
        assert_eq!(plan, vec![(ids[0], 0), (ids[1], 1), (ids[2], 2)]);
    }

    #[test]
    fn test_every_move_stays_contiguous() {
        let ids = ids(6);
        let items = contiguous(&ids);
        for from in 0..ids.len() {
            for target in -1..=7 {
                let result = apply(&items, &plan_move(&items, ids[from], target));
                let positions: Vec<i32> = result.iter().map(|(_, p)| *p).collect();
                assert_eq!(positions, (0..6).collect::<Vec<i32>>());
            }
        }
    }
}
