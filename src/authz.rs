//! Role checks against resolved profiles
//!
//! Checks consult [`Profile::roles`], which is derived once from
//! `raw_attributes["app_metadata"]["roles"]`. A missing section, a non-array
//! value, or a missing entry all mean "no".

use crate::profile::Profile;

/// Check whether a profile holds `role`
pub fn has_role(profile: &Profile, role: &str) -> bool {
    profile.has_role(role)
}

impl Profile {
    /// Check if the profile's app metadata lists a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
