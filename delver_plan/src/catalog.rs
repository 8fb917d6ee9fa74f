// Room-type catalog, demand computation, and footprint assignment.
//
// Each `RoomTypeSpec` describes one kind of room: size limits, a priority
// (0 = structural, never demand-matched; lower is more urgent), a demand
// rule, and the depth band it prefers. Behavioural differences between room
// kinds live here as data, not as branches in the planner.
//
// `compute_demand` turns the catalog plus current room counts and
// population into an ordered list of outstanding needs. `assign_footprints`
// walks candidate footprints in traversal order and hands each to the first
// unsatisfied demand item that fits. The assignment is greedy first-fit: a
// large footprint early in the order can go to a small room, leaving only
// later footprints too small for a larger room still owed.
//
// See also: `config.rs` which carries the catalog in `PlannerConfig`,
// `planner.rs` (expansion) which feeds BSP leaves through here.

use crate::geometry::Rect;
use crate::room::RoomKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many rooms of a kind a settlement wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandRule {
    Fixed(u32),
    /// One room per this many residents, rounded up.
    PerPopulation(u32),
    /// One room per this many soldiers, rounded up.
    PerMilitary(u32),
}

impl DemandRule {
    pub fn target(self, population: u32, military: u32) -> u32 {
        match self {
            DemandRule::Fixed(n) => n,
            DemandRule::PerPopulation(per) => div_ceil_or_zero(population, per),
            DemandRule::PerMilitary(per) => div_ceil_or_zero(military, per),
        }
    }
}

/// Ceiling division; a zero divisor means no demand.
fn div_ceil_or_zero(n: u32, per: u32) -> u32 {
    if per == 0 { 0 } else { n.div_ceil(per) }
}

/// Preferred depth band, shallowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZBand {
    Entry,
    Residential,
    Industrial,
    Deep,
}

/// Catalog entry for one room kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTypeSpec {
    pub kind: RoomKind,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    /// 0 = structural (depot, corridor, stairwell); lower is more urgent.
    pub priority: u8,
    pub demand: DemandRule,
    pub z_band: ZBand,
}

impl RoomTypeSpec {
    fn new(
        kind: RoomKind,
        priority: u8,
        demand: DemandRule,
        z_band: ZBand,
        (min, max): (i32, i32),
    ) -> Self {
        Self {
            kind,
            min_width: min,
            min_height: min,
            max_width: max,
            max_height: max,
            priority,
            demand,
            z_band,
        }
    }

    pub fn fits(&self, footprint: Rect) -> bool {
        footprint.width >= self.min_width && footprint.height >= self.min_height
    }
}

pub fn default_catalog() -> Vec<RoomTypeSpec> {
    use DemandRule::*;
    use RoomKind::*;
    use ZBand::*;
    vec![
        RoomTypeSpec::new(TradeDepot, 0, Fixed(1), Entry, (5, 5)),
        RoomTypeSpec::new(Corridor, 0, Fixed(0), Entry, (1, 1)),
        RoomTypeSpec::new(Stairwell, 0, Fixed(1), Entry, (3, 3)),
        RoomTypeSpec::new(DiningHall, 1, PerPopulation(20), Entry, (6, 10)),
        RoomTypeSpec::new(Bedroom, 1, PerPopulation(1), Residential, (3, 4)),
        RoomTypeSpec::new(Stockpile, 2, Fixed(2), Entry, (5, 10)),
        RoomTypeSpec::new(Workshop, 2, Fixed(4), Industrial, (4, 6)),
        RoomTypeSpec::new(Well, 3, Fixed(1), Entry, (3, 3)),
        RoomTypeSpec::new(Hospital, 3, PerPopulation(50), Residential, (5, 8)),
        RoomTypeSpec::new(Barracks, 3, PerMilitary(10), Industrial, (6, 10)),
        RoomTypeSpec::new(Tavern, 4, Fixed(1), Entry, (6, 10)),
        RoomTypeSpec::new(Temple, 4, Fixed(1), Deep, (6, 10)),
        RoomTypeSpec::new(Library, 5, Fixed(1), Deep, (5, 8)),
        RoomTypeSpec::new(Tomb, 5, PerPopulation(10), Deep, (3, 5)),
    ]
}

pub fn spec_for(catalog: &[RoomTypeSpec], kind: RoomKind) -> Option<&RoomTypeSpec> {
    catalog.iter().find(|spec| spec.kind == kind)
}

/// One outstanding need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandItem {
    pub kind: RoomKind,
    pub remaining: u32,
    pub priority: u8,
    pub z_band: ZBand,
}

/// Outstanding needs for every non-structural catalog entry, most urgent
/// first. Entries already satisfied are left out. Equal priorities keep
/// catalog order.
pub fn compute_demand(
    catalog: &[RoomTypeSpec],
    counts: &BTreeMap<RoomKind, u32>,
    population: u32,
    military: u32,
) -> Vec<DemandItem> {
    let mut demand: Vec<DemandItem> = catalog
        .iter()
        .filter(|spec| spec.priority > 0)
        .filter_map(|spec| {
            let current = counts.get(&spec.kind).copied().unwrap_or(0);
            let remaining = spec
                .demand
                .target(population, military)
                .saturating_sub(current);
            (remaining > 0).then(|| DemandItem {
                kind: spec.kind,
                remaining,
                priority: spec.priority,
                z_band: spec.z_band,
            })
        })
        .collect();
    demand.sort_by_key(|item| item.priority);
    demand
}

/// A footprint handed to a room kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Assignment {
    /// Index into the footprint slice passed to `assign_footprints`.
    pub footprint_index: usize,
    pub footprint: Rect,
    pub kind: RoomKind,
}

/// Greedy first-fit: each footprint, in order, goes to the first demand item
/// with rooms still owed whose minimum size fits. Footprints nothing fits
/// are left unassigned.
pub fn assign_footprints(
    footprints: &[Rect],
    demand: &[DemandItem],
    catalog: &[RoomTypeSpec],
) -> Vec<Assignment> {
    let mut remaining: Vec<u32> = demand.iter().map(|item| item.remaining).collect();
    let mut assignments = Vec::new();

    for (footprint_index, &footprint) in footprints.iter().enumerate() {
        let pick = demand.iter().enumerate().position(|(i, item)| {
            remaining[i] > 0
                && spec_for(catalog, item.kind).is_some_and(|spec| spec.fits(footprint))
        });
        if let Some(i) = pick {
            remaining[i] -= 1;
            assignments.push(Assignment {
                footprint_index,
                footprint,
                kind: demand[i].kind,
            });
        }
        if remaining.iter().all(|&r| r == 0) {
            break;
        }
    }
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(RoomKind, u32)]) -> BTreeMap<RoomKind, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn structural_rooms_are_never_demanded() {
        let demand = compute_demand(&default_catalog(), &BTreeMap::new(), 0, 0);
        assert!(demand.iter().all(|d| d.priority > 0));
        assert!(!demand.iter().any(|d| d.kind == RoomKind::TradeDepot));
    }

    #[test]
    fn per_population_rounds_up() {
        let demand = compute_demand(&default_catalog(), &BTreeMap::new(), 21, 0);
        let dining = demand.iter().find(|d| d.kind == RoomKind::DiningHall).unwrap();
        assert_eq!(dining.remaining, 2);
        let bedrooms = demand.iter().find(|d| d.kind == RoomKind::Bedroom).unwrap();
        assert_eq!(bedrooms.remaining, 21);
        let tombs = demand.iter().find(|d| d.kind == RoomKind::Tomb).unwrap();
        assert_eq!(tombs.remaining, 3);
        assert!(!demand.iter().any(|d| d.kind == RoomKind::Barracks));
    }

    #[test]
    fn existing_rooms_reduce_demand() {
        let have = counts(&[(RoomKind::Workshop, 3), (RoomKind::Stockpile, 5)]);
        let demand = compute_demand(&default_catalog(), &have, 0, 25);
        let workshops = demand.iter().find(|d| d.kind == RoomKind::Workshop).unwrap();
        assert_eq!(workshops.remaining, 1);
        assert!(!demand.iter().any(|d| d.kind == RoomKind::Stockpile));
        let barracks = demand.iter().find(|d| d.kind == RoomKind::Barracks).unwrap();
        assert_eq!(barracks.remaining, 3);
    }

    #[test]
    fn demand_sorted_by_priority_stably() {
        let demand = compute_demand(&default_catalog(), &BTreeMap::new(), 40, 10);
        for pair in demand.windows(2) {
            assert!(pair[0].priority <= pair[1].priority);
        }
        // Same priority keeps catalog order.
        assert_eq!(demand[0].kind, RoomKind::DiningHall);
        assert_eq!(demand[1].kind, RoomKind::Bedroom);
    }

    #[test]
    fn satisfied_catalog_yields_no_demand() {
        let have: BTreeMap<RoomKind, u32> =
            RoomKind::ALL.iter().map(|&kind| (kind, 100)).collect();
        assert!(compute_demand(&default_catalog(), &have, 50, 50).is_empty());
    }

    #[test]
    fn first_fit_skips_items_that_do_not_fit() {
        let catalog = default_catalog();
        let demand = vec![
            DemandItem {
                kind: RoomKind::DiningHall,
                remaining: 1,
                priority: 1,
                z_band: ZBand::Entry,
            },
            DemandItem {
                kind: RoomKind::Bedroom,
                remaining: 2,
                priority: 1,
                z_band: ZBand::Residential,
            },
        ];
        let footprints = [
            Rect::new(0, 0, 4, 4),
            Rect::new(10, 0, 8, 8),
            Rect::new(20, 0, 5, 5),
            Rect::new(30, 0, 9, 9),
        ];
        let got = assign_footprints(&footprints, &demand, &catalog);
        let kinds: Vec<(usize, RoomKind)> =
            got.iter().map(|a| (a.footprint_index, a.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (0, RoomKind::Bedroom),
                (1, RoomKind::DiningHall),
                (2, RoomKind::Bedroom),
            ]
        );
    }

    #[test]
    fn greedy_first_fit_is_not_optimal() {
        let catalog = default_catalog();
        let demand = vec![
            DemandItem {
                kind: RoomKind::Bedroom,
                remaining: 1,
                priority: 1,
                z_band: ZBand::Residential,
            },
            DemandItem {
                kind: RoomKind::Temple,
                remaining: 1,
                priority: 4,
                z_band: ZBand::Deep,
            },
        ];
        // The bedroom takes the big footprint because it comes first; the
        // temple cannot use the small one and goes unserved.
        let footprints = [Rect::new(5, 0, 8, 8), Rect::new(0, 0, 3, 3)];
        let got = assign_footprints(&footprints, &demand, &catalog);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].kind, RoomKind::Bedroom);
        assert_eq!(got[0].footprint_index, 0);

        // Small footprint first: both rooms are placed.
        let footprints = [Rect::new(0, 0, 3, 3), Rect::new(5, 0, 8, 8)];
        let got = assign_footprints(&footprints, &demand, &catalog);
        let kinds: Vec<RoomKind> = got.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![RoomKind::Bedroom, RoomKind::Temple]);
    }
}
