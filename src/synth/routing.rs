use crate::{
    error::{Error, Result},
    OSCILLATOR_COUNT,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
FM Routing
==========

Each operator may name a set of destinations: the operators whose phase it
modulates. An operator with no (enabled) destination is a carrier and is
heard directly. Destinations must lie strictly later in the operator
order, which rules out cycles by construction:

    stack     0 → 1 → 2 → 3          one carrier (3)
    square    0 → 1,  2 → 3          two carriers (1, 3)
    3to1      0, 1, 2 → 3            one carrier (3)
    parallel  (no destinations)      four carriers

Resolving a routing against the set of enabled operators yields a plan
that is plain data: for every operator, the enabled destinations it feeds,
whether anything modulates it, and whether it is a carrier. A disabled
destination is dropped from the plan, so an operator whose destinations
are all disabled becomes a carrier.

Rendering follows the plan in ascending operator order. By the time
operator i is rendered, every operator that modulates it already has, so
its modulation input is complete:

    mod[j] += out[i]        for every destination j of i
    out[j]  = amp[j] · cos(phase[j] + mod[j])

This is the same sum a chain of FreqModulation stages computes. An
operator feeding several destinations is rendered once and its output
added to each of them, which is what independent copies fed identical
input would produce.

Because the plan holds no nodes, rerouting a sounding voice only swaps the
plan. Every operator keeps its phase and envelope, disabled ones included.
*/

/// Set of operator indices an operator modulates.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Destinations(u8);

impl Destinations {
    pub const NONE: Self = Self(0);

    /// Validate `targets` as destinations of operator `from`.
    pub fn new(from: usize, targets: &[usize]) -> Result<Self> {
        let mut mask = 0u8;
        for &to in targets {
            if to <= from || to >= OSCILLATOR_COUNT {
                return Err(Error::InvalidDestination { from, to });
            }
            mask |= 1 << to;
        }
        Ok(Self(mask))
    }

    pub(crate) fn single(to: usize) -> Self {
        Self(1 << to)
    }

    pub fn contains(&self, index: usize) -> bool {
        index < OSCILLATOR_COUNT && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..OSCILLATOR_COUNT).filter(move |&i| self.contains(i))
    }

    fn only(self, enabled: [bool; OSCILLATOR_COUNT]) -> Self {
        let mask = (0..OSCILLATOR_COUNT)
            .filter(|&i| enabled[i])
            .fold(0u8, |mask, i| mask | 1 << i);
        Self(self.0 & mask)
    }
}

/// Destination table for the four operators of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Routing {
    routes: [Destinations; OSCILLATOR_COUNT],
}

impl Routing {
    pub fn new(routes: [Destinations; OSCILLATOR_COUNT]) -> Self {
        Self { routes }
    }

    pub fn destinations(&self, index: usize) -> Destinations {
        self.routes[index]
    }

    /// Resolve the routing against the operators that are switched on.
    pub fn final_output(&self, enabled: [bool; OSCILLATOR_COUNT]) -> Resolved {
        let mut resolved = Resolved::default();
        for index in (0..OSCILLATOR_COUNT).filter(|&i| enabled[i]) {
            let targets = self.routes[index].only(enabled);
            for j in targets.iter() {
                resolved.modulated[j] = true;
            }
            resolved.enabled[index] = true;
            resolved.targets[index] = targets;
        }
        resolved
    }

    /// Carrier indices for a set of enabled operators.
    pub fn carriers(&self, enabled: [bool; OSCILLATOR_COUNT]) -> Vec<usize> {
        self.final_output(enabled).carriers().collect()
    }
}

/// A routing resolved against the enabled operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolved {
    enabled: [bool; OSCILLATOR_COUNT],
    targets: [Destinations; OSCILLATOR_COUNT],
    modulated: [bool; OSCILLATOR_COUNT],
}

impl Resolved {
    pub fn is_enabled(&self, index: usize) -> bool {
        self.enabled[index]
    }

    /// Enabled destinations of `index`; empty for carriers and disabled operators.
    pub fn targets(&self, index: usize) -> Destinations {
        self.targets[index]
    }

    /// At least one enabled operator modulates `index`.
    pub fn is_modulated(&self, index: usize) -> bool {
        self.modulated[index]
    }

    pub fn is_carrier(&self, index: usize) -> bool {
        self.enabled[index] && self.targets[index].is_empty()
    }

    pub fn carriers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..OSCILLATOR_COUNT).filter(move |&i| self.is_carrier(i))
    }

    pub fn carrier_count(&self) -> usize {
        self.carriers().count()
    }
}
