//! Transfer plans
//!
//! Turns the arguments of a compound operation into an ordered list of
//! aspirate and dispense steps:
//!
//! 1. Expand rows into wells for single-channel pipettes
//! 2. Pair sources with destinations, repeating the shorter side
//! 3. Resolve one volume per pair
//! 4. Split pairs larger than the tip
//! 5. Group pairs into batches for the mode

use alloc::vec;
use alloc::vec::Vec;

use super::options::{check_volume, Gradient, TransferMode, TransferOptions, Volumes};
use crate::error::{InvalidArgument, PipetteError};
use crate::labware::{Location, Locations, Site};

/// Most tip loads a single pair may be split into
pub const MAX_SPLIT_PARTS: usize = 1000;

/// One liquid movement of a plan
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Aspirate { location: Location, volume: f64 },
    Dispense { location: Location, volume: f64 },
}

impl Step {
    pub fn is_aspirate(&self) -> bool {
        matches!(self, Step::Aspirate { .. })
    }

    pub fn location(&self) -> &Location {
        match self {
            Step::Aspirate { location, .. } | Step::Dispense { location, .. } => location,
        }
    }

    pub fn volume(&self) -> f64 {
        match self {
            Step::Aspirate { volume, .. } | Step::Dispense { volume, .. } => *volume,
        }
    }
}

/// Pipette properties a plan depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanLimits {
    pub channels: u8,
    pub max_volume: f64,
    pub min_volume: f64,
}

#[derive(Debug, Clone)]
struct Pair {
    source: Location,
    destination: Location,
    volume: f64,
}

/// Build the step list for a compound operation
pub fn build(
    mode: TransferMode,
    limits: PlanLimits,
    volumes: &Volumes,
    sources: &Locations,
    destinations: &Locations,
    options: &TransferOptions,
) -> Result<Vec<Step>, PipetteError> {
    options.validate()?;
    let capacity = limits.max_volume - options.air_gap;
    if !(capacity > 0.0) {
        return Err(InvalidArgument::AirGapTooLarge.into());
    }

    let sources = expand(sources, limits.channels);
    let destinations = expand(destinations, limits.channels);
    let (sources, destinations) = broadcast(sources, destinations)?;
    let volumes = resolve_volumes(volumes, sources.len(), options.gradient.as_ref())?;

    let mut pairs = Vec::with_capacity(volumes.len());
    for ((source, destination), volume) in sources.into_iter().zip(destinations).zip(volumes) {
        if volume > capacity && !options.carryover {
            return Err(PipetteError::CarryoverDisabled {
                volume,
                max: capacity,
            });
        }
        if volume > capacity * MAX_SPLIT_PARTS as f64 {
            return Err(InvalidArgument::UnboundedVolume.into());
        }
        for part in split(volume, capacity) {
            pairs.push(Pair {
                source: source.clone(),
                destination: destination.clone(),
                volume: part,
            });
        }
    }

    let steps = match mode {
        TransferMode::Transfer => pairs
            .into_iter()
            .flat_map(|p| {
                [
                    Step::Aspirate {
                        location: p.source,
                        volume: p.volume,
                    },
                    Step::Dispense {
                        location: p.destination,
                        volume: p.volume,
                    },
                ]
            })
            .collect(),
        TransferMode::Distribute => {
            let disposal = options.disposal_vol.unwrap_or(limits.min_volume);
            distribute(pairs, capacity, disposal)
        }
        TransferMode::Consolidate => consolidate(pairs, capacity),
    };
    Ok(steps)
}

/// Single-channel pipettes address rows one well at a time
fn expand(locations: &Locations, channels: u8) -> Vec<Location> {
    let mut out = Vec::with_capacity(locations.len());
    for location in locations.iter() {
        match &location.site {
            Site::Row(row) if channels == 1 => {
                out.extend(row.wells().map(|well| Location {
                    site: Site::Well(well),
                    offset: location.offset,
                }));
            }
            _ => out.push(location.clone()),
        }
    }
    out
}

/// Repeat each element of the shorter side in place until both match
fn broadcast(
    sources: Vec<Location>,
    destinations: Vec<Location>,
) -> Result<(Vec<Location>, Vec<Location>), InvalidArgument> {
    let (s, d) = (sources.len(), destinations.len());
    if s == 0 || d == 0 {
        return Err(InvalidArgument::EmptyLocations);
    }
    if s == d {
        Ok((sources, destinations))
    } else if d % s == 0 {
        Ok((repeat_each(sources, d / s), destinations))
    } else if s % d == 0 {
        Ok((sources, repeat_each(destinations, s / d)))
    } else {
        Err(InvalidArgument::NotDivisible {
            sources: s,
            destinations: d,
        })
    }
}

fn repeat_each(locations: Vec<Location>, times: usize) -> Vec<Location> {
    locations
        .into_iter()
        .flat_map(|l| core::iter::repeat(l).take(times))
        .collect()
}

/// Round to a millionth of a microlitre so ramps land on exact values
fn quantize(volume: f64) -> f64 {
    ((volume * 1e6 + 0.5) as i64) as f64 / 1e6
}

/// Non-negative inputs only
fn floor(x: f64) -> f64 {
    // from 2^52 up every f64 is already whole
    if x >= 4_503_599_627_370_496.0 {
        return x;
    }
    (x as u64) as f64
}

fn ceil(x: f64) -> f64 {
    let f = floor(x);
    if f < x {
        f + 1.0
    } else {
        f
    }
}

/// One volume per pair
pub(crate) fn resolve_volumes(
    volumes: &Volumes,
    count: usize,
    gradient: Option<&Gradient>,
) -> Result<Vec<f64>, InvalidArgument> {
    let position = |i: usize| {
        if count > 1 {
            i as f64 / (count - 1) as f64
        } else {
            0.0
        }
    };
    let factor = |i: usize| gradient.map_or(1.0, |g| g.apply(position(i)));

    let resolved: Vec<f64> = match volumes {
        Volumes::Single(v) => (0..count).map(|i| *v * factor(i)).collect(),
        Volumes::List(list) => {
            if list.len() != count {
                return Err(InvalidArgument::VolumeCountMismatch {
                    volumes: list.len(),
                    transfers: count,
                });
            }
            list.iter().enumerate().map(|(i, v)| *v * factor(i)).collect()
        }
        Volumes::Range(start, end) => {
            let shape = |i: usize| gradient.map_or(position(i), |g| g.apply(position(i)));
            (0..count).map(|i| start + (end - start) * shape(i)).collect()
        }
    };

    let mut out = Vec::with_capacity(resolved.len());
    for v in resolved {
        check_volume(v)?;
        out.push(if gradient.is_some() || matches!(volumes, Volumes::Range(..)) {
            quantize(v)
        } else {
            v
        });
    }
    Ok(out)
}

/// Split `volume` into the fewest near-equal parts that fit `capacity`
///
/// Whole microlitres left over go one each to the earliest parts. When
/// that would overfill the tip the parts are made equal instead.
pub(crate) fn split(volume: f64, capacity: f64) -> Vec<f64> {
    if volume <= capacity {
        return vec![volume];
    }
    let n = (ceil(volume / capacity) as usize).max(2);
    let parts = whole_parts(volume, n);
    if parts.iter().all(|p| *p <= capacity) {
        parts
    } else {
        even_parts(volume, n, capacity)
    }
}

fn whole_parts(volume: f64, n: usize) -> Vec<f64> {
    let base = floor(volume / n as f64);
    let remainder = volume - base * n as f64;
    let whole = floor(remainder) as usize;
    let residue = remainder - whole as f64;

    let mut parts = vec![base; n];
    for part in parts.iter_mut().take(whole) {
        *part += 1.0;
    }
    if residue > 0.0 && whole < n {
        parts[whole] = quantize(parts[whole] + residue);
    }
    parts
}

/// Equal parts rounded down to a millionth, the last taking the rest
fn even_parts(volume: f64, n: usize, capacity: f64) -> Vec<f64> {
    let part = floor(volume / n as f64 * 1e6) / 1e6;
    let last = quantize(volume - part * (n - 1) as f64);
    if part > 0.0 && last <= capacity {
        let mut parts = vec![part; n];
        parts[n - 1] = last;
        parts
    } else {
        vec![(volume / n as f64).min(capacity); n]
    }
}

/// One aspirate per batch of destinations
///
/// A batch closes when the source changes or the next volume would not
/// fit beside the disposal volume. Batches serving more than one
/// destination aspirate the disposal volume on top.
fn distribute(pairs: Vec<Pair>, capacity: f64, disposal: f64) -> Vec<Step> {
    let limit = capacity - disposal;
    let mut steps = Vec::new();
    let mut source: Option<Location> = None;
    let mut batch: Vec<Step> = Vec::new();
    let mut drawn = 0.0;

    let mut flush = |source: &Option<Location>, batch: &mut Vec<Step>, drawn: &mut f64| {
        if let Some(location) = source {
            if !batch.is_empty() {
                let extra = if batch.len() > 1 { disposal } else { 0.0 };
                steps.push(Step::Aspirate {
                    location: location.clone(),
                    volume: *drawn + extra,
                });
                steps.append(batch);
            }
        }
        *drawn = 0.0;
    };

    for pair in pairs {
        let same_source = source.as_ref() == Some(&pair.source);
        if !batch.is_empty() && (!same_source || drawn + pair.volume > limit) {
            flush(&source, &mut batch, &mut drawn);
        }
        drawn += pair.volume;
        source = Some(pair.source);
        batch.push(Step::Dispense {
            location: pair.destination,
            volume: pair.volume,
        });
    }
    flush(&source, &mut batch, &mut drawn);
    steps
}

/// One dispense per batch of sources
///
/// A batch closes when the destination changes or the next volume would
/// overfill the tip.
fn consolidate(pairs: Vec<Pair>, capacity: f64) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut destination: Option<Location> = None;
    let mut batch: Vec<Step> = Vec::new();
    let mut held = 0.0;

    let mut flush = |destination: &Option<Location>, batch: &mut Vec<Step>, held: &mut f64| {
        if let Some(location) = destination {
            if !batch.is_empty() {
                steps.append(batch);
                steps.push(Step::Dispense {
                    location: location.clone(),
                    volume: *held,
                });
            }
        }
        *held = 0.0;
    };

    for pair in pairs {
        let same_destination = destination.as_ref() == Some(&pair.destination);
        if !batch.is_empty() && (!same_destination || held + pair.volume > capacity) {
            flush(&destination, &mut batch, &mut held);
        }
        held += pair.volume;
        destination = Some(pair.destination);
        batch.push(Step::Aspirate {
            location: pair.source,
            volume: pair.volume,
        });
    }
    flush(&destination, &mut batch, &mut held);
    steps
}
