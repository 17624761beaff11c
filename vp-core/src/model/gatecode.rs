/// The packed bit-flag gate classification code (spec.md §3, §4.8).
use vp_types::{GateFlag, ProfileType, QuantityType};

/// One gate's classification, an 8-bit packed flag set. Each bit is an
/// independent yes/no predicate; setting one bit never touches another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateCode(pub u8);

impl GateCode {
    pub fn new() -> Self {
        GateCode(0)
    }

    pub fn set(&mut self, flag: GateFlag) {
        self.0 |= flag.mask();
    }

    pub fn clear(&mut self, flag: GateFlag) {
        self.0 &= !flag.mask();
    }

    pub fn is_set(&self, flag: GateFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// `includeGate` truth table from spec.md §4.11: whether a gate
    /// classified by this code should contribute to the given profile
    /// type's accumulation for the given quantity.
    ///
    /// `require_vrad` mirrors the `requireVrad` config option: when true, a
    /// missing radial velocity also excludes a gate from the reflectivity
    /// pass, not only the velocity pass.
    pub fn include(self, profile_type: ProfileType, quantity: QuantityType, require_vrad: bool) -> bool {
        use GateFlag::*;
        use ProfileType::*;
        use QuantityType::*;

        if self.is_set(StaticClutter) || self.is_set(VradTooLow) {
            return false;
        }

        let vrad_missing = self.is_set(VradMissing);
        match quantity {
            Velocity => {
                if vrad_missing || self.is_set(VDifMax) {
                    return false;
                }
            }
            Reflectivity => {
                // Azimuth restriction applies only to the reflectivity
                // selection: a wind fit needs data at all azimuths, so the
                // velocity pass ignores this bit entirely.
                if (vrad_missing && require_vrad) || self.is_set(AzimOutOfRange) {
                    return false;
                }
            }
        }

        match profile_type {
            Birds => {
                // Birds exclude weather cells and their fringe regardless
                // of quantity; the "too high for birds" ceiling only
                // matters for the reflectivity accumulation, not velocity.
                if self.is_set(DynamicClutter) || self.is_set(DynamicClutterFringe) {
                    return false;
                }
                if quantity == Reflectivity && self.is_set(DbzTooHighForBirds) {
                    return false;
                }
                true
            }
            All => true,
            NonBirds => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_independent() {
        let mut g = GateCode::new();
        g.set(GateFlag::StaticClutter);
        g.set(GateFlag::VDifMax);
        assert!(g.is_set(GateFlag::StaticClutter));
        assert!(g.is_set(GateFlag::VDifMax));
        assert!(!g.is_set(GateFlag::VradTooLow));
        g.clear(GateFlag::StaticClutter);
        assert!(!g.is_set(GateFlag::StaticClutter));
        assert!(g.is_set(GateFlag::VDifMax));
    }

    #[test]
    fn static_clutter_excludes_everything() {
        let mut g = GateCode::new();
        g.set(GateFlag::StaticClutter);
        for pt in [ProfileType::Birds, ProfileType::All] {
            for q in [QuantityType::Reflectivity, QuantityType::Velocity] {
                assert!(!g.include(pt, q, false));
            }
        }
    }

    #[test]
    fn birds_exclude_dynamic_clutter_but_all_includes_it() {
        let mut g = GateCode::new();
        g.set(GateFlag::DynamicClutter);
        assert!(!g.include(ProfileType::Birds, QuantityType::Reflectivity, false));
        assert!(!g.include(ProfileType::Birds, QuantityType::Velocity, false));
        assert!(g.include(ProfileType::All, QuantityType::Reflectivity, false));
        assert!(g.include(ProfileType::All, QuantityType::Velocity, false));
    }

    #[test]
    fn dbz_too_high_excludes_birds_reflectivity_only() {
        let mut g = GateCode::new();
        g.set(GateFlag::DbzTooHighForBirds);
        assert!(!g.include(ProfileType::Birds, QuantityType::Reflectivity, false));
        assert!(g.include(ProfileType::Birds, QuantityType::Velocity, false));
        assert!(g.include(ProfileType::All, QuantityType::Reflectivity, false));
        assert!(g.include(ProfileType::All, QuantityType::Velocity, false));
    }

    #[test]
    fn vrad_missing_only_excludes_reflectivity_when_required() {
        let mut g = GateCode::new();
        g.set(GateFlag::VradMissing);
        assert!(g.include(ProfileType::All, QuantityType::Reflectivity, false));
        assert!(!g.include(ProfileType::All, QuantityType::Reflectivity, true));
        assert!(!g.include(ProfileType::All, QuantityType::Velocity, false));
    }

    #[test]
    fn vdifmax_only_excludes_velocity() {
        let mut g = GateCode::new();
        g.set(GateFlag::VDifMax);
        assert!(g.include(ProfileType::All, QuantityType::Reflectivity, false));
        assert!(!g.include(ProfileType::All, QuantityType::Velocity, false));
    }

    #[test]
    fn azim_out_of_range_only_excludes_reflectivity() {
        // A wind fit needs data at every azimuth, so the VVP velocity pass
        // must not drop gates for falling outside [azimMin, azimMax].
        let mut g = GateCode::new();
        g.set(GateFlag::AzimOutOfRange);
        for pt in [ProfileType::Birds, ProfileType::All] {
            assert!(!g.include(pt, QuantityType::Reflectivity, false));
            assert!(g.include(pt, QuantityType::Velocity, false));
        }
    }
}
