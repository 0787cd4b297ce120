//! Bit-packing for [`crate::message::Modifiers`] in the order the debug
//! channel expects: `{alt=1, ctrl=2, meta=4, shift=8}` (§4.B).

use crate::message::Modifiers;

pub const ALT: u32 = 1;
pub const CTRL: u32 = 2;
pub const META: u32 = 4;
pub const SHIFT: u32 = 8;

pub fn set_to_flags(set: Modifiers) -> u32 {
    let mut flags = 0;
    if set.alt {
        flags |= ALT;
    }
    if set.ctrl {
        flags |= CTRL;
    }
    if set.meta {
        flags |= META;
    }
    if set.shift {
        flags |= SHIFT;
    }
    flags
}

pub fn flags_to_set(flags: u32) -> Modifiers {
    Modifiers {
        ctrl: flags & CTRL != 0,
        shift: flags & SHIFT != 0,
        alt: flags & ALT != 0,
        meta: flags & META != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_order_matches_spec() {
        assert_eq!(set_to_flags(Modifiers { alt: true, ..Default::default() }), ALT);
        assert_eq!(set_to_flags(Modifiers { ctrl: true, ..Default::default() }), CTRL);
        assert_eq!(set_to_flags(Modifiers { meta: true, ..Default::default() }), META);
        assert_eq!(set_to_flags(Modifiers { shift: true, ..Default::default() }), SHIFT);
    }

    #[test]
    fn round_trips_every_combination() {
        for flags in 0..16u32 {
            assert_eq!(set_to_flags(flags_to_set(flags)), flags);
        }
    }
}
