//! Plan execution
//!
//! Walks a step list and drives the pipette through it: tip changes,
//! mixing, touch-tip, air gaps and blow-outs are inserted around the
//! aspirates and dispenses the plan calls for.
//!
//! Distribute mixes only before aspirating from its source. Consolidate
//! mixes only after dispensing into its destination.

use super::options::{Mix, TipPolicy, TransferMode, TransferOptions};
use super::plan::Step;
use crate::error::PipetteError;
use crate::labware::{Location, Site};
use crate::pipette::Pipette;
use crate::queue::CommandQueue;

/// Height above the rim an air gap is dispensed at, in mm
pub const AIR_GAP_DISPENSE_HEIGHT: f64 = 5.0;

/// Depth below the rim touch-tip runs at, in mm
pub const TOUCH_TIP_OFFSET: f64 = -1.0;

/// Drive `pipette` through `steps`
pub(crate) fn execute(
    pipette: &mut Pipette,
    queue: &mut CommandQueue,
    mode: TransferMode,
    steps: &[Step],
    options: &TransferOptions,
) -> Result<(), PipetteError> {
    let mix_before = if mode == TransferMode::Consolidate {
        None
    } else {
        options.mix_before
    };
    let mix_after = if mode == TransferMode::Distribute {
        None
    } else {
        options.mix_after
    };
    let mut tips = match options.new_tip {
        TipPolicy::Always => usize::MAX,
        TipPolicy::Once => 1,
        TipPolicy::Never => 0,
    };

    for (i, step) in steps.iter().enumerate() {
        let next = steps.get(i + 1);
        match step {
            Step::Aspirate { location, volume } => {
                if !pipette.has_tip() && tips > 0 {
                    pipette.pick_up_tip(queue, None)?;
                    tips -= 1;
                }
                aspirate(pipette, queue, location, *volume, mix_before, options)?;
                if options.air_gap > 0.0 && matches!(next, Some(Step::Dispense { .. })) {
                    pipette.air_gap(queue, Some(options.air_gap), None)?;
                }
            }
            Step::Dispense { location, volume } => {
                dispense(pipette, queue, location, *volume, mix_after, options)?;
                let batch_end = next.map_or(true, Step::is_aspirate);
                if batch_end {
                    finish_batch(pipette, queue, options, next.is_none())?;
                } else if options.air_gap > 0.0 {
                    pipette.air_gap(queue, Some(options.air_gap), None)?;
                }
            }
        }
    }
    Ok(())
}

fn aspirate(
    pipette: &mut Pipette,
    queue: &mut CommandQueue,
    location: &Location,
    volume: f64,
    mix: Option<Mix>,
    options: &TransferOptions,
) -> Result<(), PipetteError> {
    if let Some(mix) = mix {
        if pipette.current_volume() == 0.0 {
            pipette.mix(
                queue,
                mix.repetitions,
                Some(mix.volume),
                Some(location.clone()),
                options.rate,
            )?;
        }
    }
    pipette.aspirate(queue, Some(volume), Some(location.clone()), options.rate)?;
    if options.touch_tip {
        pipette.touch_tip(queue, None, 1.0, TOUCH_TIP_OFFSET)?;
    }
    Ok(())
}

fn dispense(
    pipette: &mut Pipette,
    queue: &mut CommandQueue,
    location: &Location,
    volume: f64,
    mix: Option<Mix>,
    options: &TransferOptions,
) -> Result<(), PipetteError> {
    let air = pipette.air_volume();
    if air > 0.0 {
        let above = location.site.top(AIR_GAP_DISPENSE_HEIGHT);
        pipette.dispense(queue, Some(air), Some(above), options.rate)?;
    }
    pipette.dispense(queue, Some(volume), Some(location.clone()), options.rate)?;
    if let Some(mix) = mix {
        if pipette.current_volume() == 0.0 {
            pipette.mix(
                queue,
                mix.repetitions,
                Some(mix.volume),
                Some(location.clone()),
                options.rate,
            )?;
        }
    }
    if options.touch_tip {
        pipette.touch_tip(queue, None, 1.0, TOUCH_TIP_OFFSET)?;
    }
    Ok(())
}

/// Blow out what is left and change the tip if the policy asks for it
fn finish_batch(
    pipette: &mut Pipette,
    queue: &mut CommandQueue,
    options: &TransferOptions,
    last: bool,
) -> Result<(), PipetteError> {
    if pipette.current_volume() > 0.0 {
        let disposal = options.blow_out_location.clone().or_else(|| {
            pipette
                .trash()
                .and_then(|t| t.get_well(0))
                .map(|w| Site::Well(w).location())
        });
        pipette.blow_out(queue, disposal)?;
    } else if options.blow_out {
        pipette.blow_out(queue, None)?;
    }

    let change = match options.new_tip {
        TipPolicy::Always => true,
        TipPolicy::Once => last,
        TipPolicy::Never => false,
    };
    if change && pipette.has_tip() {
        if options.trash && pipette.trash().is_some() {
            pipette.drop_tip(queue, None)?;
        } else {
            pipette.return_tip(queue)?;
        }
    }
    Ok(())
}
