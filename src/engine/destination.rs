//! Routing destinations a node cycles through.

use super::NODE_OUTPUTS;

/// Where a node sends a trigger.
///
/// Nodes cycle `Bus, Local(0), Local(1), Local(2), Local(3)` and wrap back
/// to `Bus`. The persisted integer form is `-1` for the bus and the output
/// index for local outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The shared polyphonic bus.
    Bus,
    /// One of the node's own trigger outputs.
    Local(usize),
}

impl Destination {
    /// Number of destinations in one cycle.
    pub const COUNT: usize = NODE_OUTPUTS + 1;

    /// The slot a node sits on before its first fire, so that the first
    /// trigger after construction or reset lands on the bus.
    pub const INITIAL: Destination = Destination::Local(NODE_OUTPUTS - 1);

    /// Returns the next destination in cycle order.
    pub fn next(self) -> Self {
        match self {
            Destination::Bus => Destination::Local(0),
            Destination::Local(i) if i + 1 < NODE_OUTPUTS => Destination::Local(i + 1),
            Destination::Local(_) => Destination::Bus,
        }
    }

    /// Returns the persisted integer form.
    pub fn to_state(self) -> i64 {
        match self {
            Destination::Bus => -1,
            Destination::Local(i) => i as i64,
        }
    }

    /// Parses the persisted integer form. Returns `None` outside -1..=3.
    pub fn from_state(state: i64) -> Option<Self> {
        match state {
            -1 => Some(Destination::Bus),
            s if (0..NODE_OUTPUTS as i64).contains(&s) => Some(Destination::Local(s as usize)),
            _ => None,
        }
    }

    /// Parses the persisted integer form, clamping into -1..=3.
    pub fn from_state_clamped(state: i64) -> Self {
        let clamped = state.clamp(-1, NODE_OUTPUTS as i64 - 1);
        Self::from_state(clamped).unwrap_or(Destination::Bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_order_wraps() {
        let mut d = Destination::Bus;
        let mut seen = Vec::new();
        for _ in 0..Destination::COUNT {
            d = d.next();
            seen.push(d.to_state());
        }
        assert_eq!(seen, vec![0, 1, 2, 3, -1]);
    }

    #[test]
    fn test_initial_precedes_bus() {
        assert_eq!(Destination::INITIAL.next(), Destination::Bus);
    }

    #[test]
    fn test_state_conversion() {
        for s in -1..=3 {
            assert_eq!(Destination::from_state(s).map(Destination::to_state), Some(s));
        }
        assert_eq!(Destination::from_state(4), None);
        assert_eq!(Destination::from_state(-2), None);
    }

    #[test]
    fn test_clamped_state() {
        assert_eq!(Destination::from_state_clamped(99), Destination::Local(3));
        assert_eq!(Destination::from_state_clamped(-7), Destination::Bus);
        assert_eq!(Destination::from_state_clamped(2), Destination::Local(2));
    }
}
