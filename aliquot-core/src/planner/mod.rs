//! Transfer planner
//!
//! Compound operations that move liquid between sets of wells. Each
//! builds a plan of aspirate and dispense steps, then drives the
//! pipette through it. A failure anywhere leaves the pipette and queue
//! as they were before the call.

pub mod options;
pub mod plan;
pub mod runner;

pub use options::{Gradient, Mix, TipPolicy, TransferMode, TransferOptions, Volumes};
pub use plan::{build, PlanLimits, Step};
pub use runner::{AIR_GAP_DISPENSE_HEIGHT, TOUCH_TIP_OFFSET};

use crate::error::PipetteError;
use crate::labware::Locations;
use crate::pipette::Pipette;
use crate::queue::CommandQueue;

impl Pipette {
    /// Limits the planner sizes batches against
    pub fn plan_limits(&self) -> PlanLimits {
        PlanLimits {
            channels: self.channels(),
            max_volume: self.max_volume(),
            min_volume: self.min_volume(),
        }
    }

    /// Move liquid pair by pair, one aspirate per dispense
    pub fn transfer(
        &mut self,
        queue: &mut CommandQueue,
        volume: impl Into<Volumes>,
        sources: impl Into<Locations>,
        destinations: impl Into<Locations>,
        options: &TransferOptions,
    ) -> Result<(), PipetteError> {
        self.run_plan(
            queue,
            TransferMode::Transfer,
            volume.into(),
            sources.into(),
            destinations.into(),
            options,
        )
    }

    /// Move liquid from a source to many destinations, aspirating once
    /// per batch
    pub fn distribute(
        &mut self,
        queue: &mut CommandQueue,
        volume: impl Into<Volumes>,
        source: impl Into<Locations>,
        destinations: impl Into<Locations>,
        options: &TransferOptions,
    ) -> Result<(), PipetteError> {
        self.run_plan(
            queue,
            TransferMode::Distribute,
            volume.into(),
            source.into(),
            destinations.into(),
            options,
        )
    }

    /// Pool liquid from many sources into a destination, dispensing once
    /// per batch
    pub fn consolidate(
        &mut self,
        queue: &mut CommandQueue,
        volume: impl Into<Volumes>,
        sources: impl Into<Locations>,
        destination: impl Into<Locations>,
        options: &TransferOptions,
    ) -> Result<(), PipetteError> {
        self.run_plan(
            queue,
            TransferMode::Consolidate,
            volume.into(),
            sources.into(),
            destination.into(),
            options,
        )
    }

    fn run_plan(
        &mut self,
        queue: &mut CommandQueue,
        mode: TransferMode,
        volumes: Volumes,
        sources: Locations,
        destinations: Locations,
        options: &TransferOptions,
    ) -> Result<(), PipetteError> {
        let steps = build(
            mode,
            self.plan_limits(),
            &volumes,
            &sources,
            &destinations,
            options,
        )?;

        #[cfg(feature = "defmt")]
        defmt::debug!("{}: {} steps planned", mode, steps.len());

        self.atomically(queue, |pipette, queue| {
            runner::execute(pipette, queue, mode, &steps, options)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipetteConfig;
    use crate::error::InvalidArgument;
    use crate::labware::{Labware, Location, Site};
    use crate::testing::{descriptions, pipette, pipette_with, plate, point};
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    /// Check each description contains every fragment on its line
    fn assert_commands(queue: &CommandQueue, expected: &[&[&str]]) {
        let actual = descriptions(queue);
        assert_eq!(
            actual.len(),
            expected.len(),
            "command count differs: {:#?}",
            actual
        );
        for (i, (command, fragments)) in actual.iter().zip(expected).enumerate() {
            let lower = command.to_lowercase();
            for fragment in fragments.iter() {
                assert!(
                    lower.contains(&fragment.to_lowercase()),
                    "command {} {:?} lacks {:?}",
                    i,
                    command,
                    fragment
                );
            }
        }
    }

    fn count(queue: &CommandQueue, prefix: &str) -> usize {
        queue.descriptions().filter(|d| d.starts_with(prefix)).count()
    }

    #[test]
    fn test_distribute_batches_with_disposal() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        p.distribute(
            &mut queue,
            30.0,
            plate.well(0),
            plate.wells(8..16),
            &TransferOptions::default(),
        )
        .unwrap();

        let mut expected: Vec<&[&str]> = Vec::new();
        expected.extend_from_slice(&[&["picking up"], &["aspirating", "190", "Well A1"]]);
        for _ in 0..6 {
            expected.push(&["dispensing", "30"]);
        }
        expected.push(&["blowing out", "trash"]);
        expected.push(&["aspirating", "70", "Well A1"]);
        expected.push(&["dispensing", "30", "Well G2"]);
        expected.push(&["dispensing", "30", "Well H2"]);
        expected.push(&["blowing out", "trash"]);
        expected.push(&["dropping tip", "trash"]);
        assert_commands(&queue, &expected);
        assert!(!p.has_tip());
    }

    #[test]
    fn test_distribute_range_blows_out_in_place() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            blow_out: true,
            ..Default::default()
        };
        p.distribute(&mut queue, (10.0, 80.0), plate.well(0), plate.row(1), &options)
            .unwrap();

        assert_commands(
            &queue,
            &[
                &["picking up"],
                &["aspirating", "160", "Well A1"],
                &["dispensing", "10", "Well A2"],
                &["dispensing", "20", "Well B2"],
                &["dispensing", "30", "Well C2"],
                &["dispensing", "40", "Well D2"],
                &["dispensing", "50", "Well E2"],
                &["blowing out at", "trash"],
                &["aspirating", "140", "Well A1"],
                &["dispensing", "60", "Well F2"],
                &["dispensing", "70", "Well G2"],
                &["blowing out at", "trash"],
                &["aspirating", "80", "Well A1"],
                &["dispensing", "80", "Well H2"],
                &["blowing out"],
                &["dropping tip"],
            ],
        );
        assert_eq!(queue.descriptions().nth(14), Some("Blowing out"));
    }

    #[test]
    fn test_distribute_gradient_with_air_gap() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            touch_tip: true,
            air_gap: 20.0,
            gradient: Some(Gradient::new(|x| 1.0 - x)),
            ..Default::default()
        };
        p.distribute(&mut queue, (10.0, 80.0), plate.well(0), plate.row(1), &options)
            .unwrap();

        let air: &[&[&str]] = &[&["air gap"], &["moving to"], &["aspirating", "20"]];
        let mut expected: Vec<&[&str]> = Vec::new();
        expected.extend_from_slice(&[
            &["picking up"],
            &["aspirating", "160", "Well A1"],
            &["touching"],
        ]);
        expected.extend_from_slice(air);
        expected.extend_from_slice(&[
            &["dispensing", "20", "Well A2"],
            &["dispensing", "80", "Well A2"],
            &["touching"],
        ]);
        expected.extend_from_slice(air);
        expected.extend_from_slice(&[
            &["dispensing", "20", "Well B2"],
            &["dispensing", "70", "Well B2"],
            &["touching"],
            &["blowing out at", "trash"],
            &["aspirating", "160", "Well A1"],
        ]);
        assert_commands_prefix(&queue, &expected);

        let liquid: Vec<String> = queue
            .descriptions()
            .filter(|d| d.starts_with("Aspirating") && !d.starts_with("Aspirating 20 uL"))
            .map(String::from)
            .collect();
        assert_eq!(
            liquid,
            vec![
                "Aspirating 160 uL from Well A1 of 96-flat at 1 speed",
                "Aspirating 160 uL from Well A1 of 96-flat at 1 speed",
                "Aspirating 70 uL from Well A1 of 96-flat at 1 speed",
            ]
        );
        assert_eq!(p.air_volume(), 0.0);
    }

    fn assert_commands_prefix(queue: &CommandQueue, expected: &[&[&str]]) {
        let actual = descriptions(queue);
        for (i, fragments) in expected.iter().enumerate() {
            let lower = actual[i].to_lowercase();
            for fragment in fragments.iter() {
                assert!(
                    lower.contains(&fragment.to_lowercase()),
                    "command {} {:?} lacks {:?}",
                    i,
                    actual[i],
                    fragment
                );
            }
        }
    }

    #[test]
    fn test_distribute_air_gap_between_destinations() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            air_gap: 20.0,
            ..Default::default()
        };
        p.distribute(&mut queue, 60.0, plate.well(16), plate.wells(0..2), &options)
            .unwrap();

        assert_commands(
            &queue,
            &[
                &["picking up"],
                &["aspirating", "130", "Well A3"],
                &["air gap"],
                &["moving to", "Well A3"],
                &["aspirating", "20"],
                &["dispensing", "20", "Well A1"],
                &["dispensing", "60", "Well A1"],
                &["air gap"],
                &["moving to", "Well A1"],
                &["aspirating", "20"],
                &["dispensing", "20", "Well B1"],
                &["dispensing", "60", "Well B1"],
                &["blowing out at", "trash"],
                &["dropping tip"],
            ],
        );
        let air_dispense = &queue.commands()[5].actions()[0];
        assert_eq!(
            air_dispense,
            &crate::queue::Action::MoveTo {
                location: Site::Well(plate.well(0)).top(AIR_GAP_DISPENSE_HEIGHT),
                strategy: crate::motion::MoveStrategy::Arc,
            }
        );
    }

    #[test]
    fn test_tip_policies() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let always = TransferOptions {
            new_tip: TipPolicy::Always,
            ..Default::default()
        };
        p.distribute(&mut queue, 30.0, plate.well(0), plate.wells(8..16), &always)
            .unwrap();
        assert_eq!(count(&queue, "Picking up tip"), 2);
        assert_eq!(count(&queue, "Dropping tip"), 2);

        queue.clear();
        p.pick_up_tip(&mut queue, None).unwrap();
        queue.clear();
        let never = TransferOptions {
            new_tip: "never".parse().unwrap(),
            ..Default::default()
        };
        p.distribute(&mut queue, 30.0, plate.well(0), plate.wells(8..16), &never)
            .unwrap();
        assert_eq!(count(&queue, "Picking up tip"), 0);
        assert_eq!(count(&queue, "Dropping tip"), 0);
        assert!(p.has_tip());

        assert_eq!(
            "sometimes".parse::<TipPolicy>(),
            Err(InvalidArgument::UnknownTipPolicy)
        );
    }

    #[test]
    fn test_never_without_tip_fails_cleanly() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let never = TransferOptions {
            new_tip: TipPolicy::Never,
            ..Default::default()
        };
        assert_eq!(
            p.transfer(&mut queue, 30.0, plate.well(0), plate.well(1), &never),
            Err(PipetteError::NoTip)
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_consolidate_batches() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        p.consolidate(
            &mut queue,
            30.0,
            plate.wells(8..16),
            plate.well(0),
            &TransferOptions::default(),
        )
        .unwrap();

        let mut expected: Vec<&[&str]> = Vec::new();
        expected.push(&["picking up"]);
        for _ in 0..6 {
            expected.push(&["aspirating", "30"]);
        }
        expected.push(&["dispensing", "180", "Well A1"]);
        expected.push(&["aspirating", "30", "Well G2"]);
        expected.push(&["aspirating", "30", "Well H2"]);
        expected.push(&["dispensing", "60", "Well A1"]);
        expected.push(&["dropping tip"]);
        assert_commands(&queue, &expected);
    }

    #[test]
    fn test_consolidate_air_gap_after_last_aspirate() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            air_gap: 10.0,
            ..Default::default()
        };
        p.consolidate(&mut queue, 30.0, plate.wells(8..10), plate.well(0), &options)
            .unwrap();
        assert_commands(
            &queue,
            &[
                &["picking up"],
                &["aspirating", "30", "Well A2"],
                &["aspirating", "30", "Well B2"],
                &["air gap"],
                &["moving to", "Well B2"],
                &["aspirating", "10"],
                &["dispensing", "10", "Well A1"],
                &["dispensing", "60", "Well A1"],
                &["dropping tip"],
            ],
        );
    }

    #[test]
    fn test_transfer_splits_over_capacity() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        p.transfer(
            &mut queue,
            598.0,
            plate.well(0),
            plate.well(1),
            &TransferOptions::default(),
        )
        .unwrap();
        assert_commands(
            &queue,
            &[
                &["picking up"],
                &["aspirating", "200"],
                &["dispensing", "200"],
                &["aspirating", "199"],
                &["dispensing", "199"],
                &["aspirating", "199"],
                &["dispensing", "199"],
                &["dropping tip"],
            ],
        );
    }

    #[test]
    fn test_carryover_disabled_emits_nothing() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            carryover: false,
            ..Default::default()
        };
        assert_eq!(
            p.transfer(&mut queue, 300.0, plate.well(0), plate.well(1), &options),
            Err(PipetteError::CarryoverDisabled {
                volume: 300.0,
                max: 200.0
            })
        );
        assert!(queue.is_empty());
        assert_eq!(p.tips().offset(), 0);
    }

    #[test]
    fn test_bad_transfers() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions::default();
        assert_eq!(
            p.transfer(&mut queue, 30.0, plate.wells(0..2), plate.wells(2..5), &options),
            Err(InvalidArgument::NotDivisible {
                sources: 2,
                destinations: 3
            }
            .into())
        );
        assert_eq!(
            p.transfer(
                &mut queue,
                vec![20.0; 4],
                plate.wells(0..3),
                plate.wells(3..6),
                &options
            ),
            Err(InvalidArgument::VolumeCountMismatch {
                volumes: 4,
                transfers: 3
            }
            .into())
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_transfer_air_gap_touch_and_blow_out() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            new_tip: TipPolicy::Always,
            air_gap: 10.0,
            touch_tip: true,
            blow_out: true,
            ..Default::default()
        };
        p.transfer(&mut queue, 30.0, plate.well(0), plate.well(1), &options)
            .unwrap();
        assert_commands(
            &queue,
            &[
                &["picking up"],
                &["aspirating", "30", "Well A1"],
                &["touching tip"],
                &["air gap"],
                &["moving to", "Well A1"],
                &["aspirating", "10"],
                &["dispensing", "10", "Well B1"],
                &["dispensing", "30", "Well B1"],
                &["touching tip"],
                &["blowing out"],
                &["dropping tip"],
            ],
        );
        assert_eq!(queue.descriptions().nth(9), Some("Blowing out"));
    }

    #[test]
    fn test_multichannel_returns_tips() {
        let plate = plate();
        let config = PipetteConfig {
            channels: 8,
            ..Default::default()
        };
        let mut p = pipette_with(config);
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            trash: false,
            ..Default::default()
        };
        p.transfer(&mut queue, 200.0, plate.row(0), plate.row(1), &options)
            .unwrap();
        assert_commands(
            &queue,
            &[
                &["picking up", "row of 8"],
                &["aspirating", "200", "Well A1"],
                &["dispensing", "200", "Well A2"],
                &["returning tip"],
                &["dropping tip", "tiprack"],
            ],
        );
        assert_eq!(p.tips().offset(), 8);
    }

    #[test]
    fn test_mix_before_and_after() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            mix_before: Some(Mix {
                repetitions: 2,
                volume: 50.0,
            }),
            mix_after: Some(Mix {
                repetitions: 3,
                volume: 40.0,
            }),
            ..Default::default()
        };
        p.transfer(&mut queue, 30.0, plate.well(0), plate.well(1), &options)
            .unwrap();

        let descriptions = descriptions(&queue);
        assert_eq!(descriptions[1], "Mixing 2 times with a volume of 50ul");
        assert_eq!(
            descriptions[6],
            "Aspirating 30 uL from Well A1 of 96-flat at 1 speed"
        );
        assert_eq!(descriptions[7], "Dispensing 30 uL into Well B1 of 96-flat");
        assert_eq!(descriptions[8], "Mixing 3 times with a volume of 40ul");
        assert_eq!(descriptions.len(), 1 + 5 + 2 + 7 + 1);
    }

    #[test]
    fn test_blow_out_location_override() {
        let plate = plate();
        let waste: Labware = point("waste");
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            blow_out_location: Some(Location::from(waste.well(0))),
            ..Default::default()
        };
        p.distribute(&mut queue, 30.0, plate.well(0), plate.wells(8..10), &options)
            .unwrap();
        assert_eq!(count(&queue, "Blowing out at Well A1 of waste"), 1);
    }

    #[test]
    fn test_distribute_mixes_before_aspirating_only() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            mix_before: Some(Mix {
                repetitions: 1,
                volume: 10.0,
            }),
            mix_after: Some(Mix {
                repetitions: 1,
                volume: 10.0,
            }),
            ..Default::default()
        };
        p.distribute(&mut queue, 200.0, plate.well(0), plate.wells(1..3), &options)
            .unwrap();
        assert_commands(
            &queue,
            &[
                &["picking up tip"],
                &["mixing", "10"],
                &["aspirating", "well a1"],
                &["dispensing"],
                &["aspirating", "200", "well a1"],
                &["dispensing", "200", "well b1"],
                &["mixing", "10"],
                &["aspirating", "well a1"],
                &["dispensing"],
                &["aspirating", "200", "well a1"],
                &["dispensing", "200", "well c1"],
                &["dropping tip"],
            ],
        );
    }

    #[test]
    fn test_consolidate_mixes_after_dispensing_only() {
        let plate = plate();
        let mut p = pipette();
        let mut queue = CommandQueue::new();
        let options = TransferOptions {
            mix_before: Some(Mix {
                repetitions: 1,
                volume: 10.0,
            }),
            mix_after: Some(Mix {
                repetitions: 1,
                volume: 10.0,
            }),
            ..Default::default()
        };
        p.consolidate(&mut queue, 200.0, plate.wells(0..2), plate.well(2), &options)
            .unwrap();
        assert_commands(
            &queue,
            &[
                &["picking up tip"],
                &["aspirating", "200", "well a1"],
                &["dispensing", "200", "well c1"],
                &["mixing", "10"],
                &["aspirating", "well c1"],
                &["dispensing"],
                &["aspirating", "200", "well b1"],
                &["dispensing", "200", "well c1"],
                &["mixing", "10"],
                &["aspirating", "well c1"],
                &["dispensing"],
                &["dropping tip"],
            ],
        );
    }
}
