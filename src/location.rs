//! Location provider registry
//!
//! The fixture owns a registry instead of mutating process-wide provider
//! state: the registry is installed for the visit-generation phase and cleared
//! before the bulk batches, so later batches are tracked without any location
//! override.

use crate::types::MockLocation;

/// Mock geolocation provider returning a fixed rotation of locations.
pub struct MockLocationProvider {
    locations: Vec<MockLocation>,
    next: usize,
}

impl MockLocationProvider {
    pub fn new(locations: Vec<MockLocation>) -> Self {
        MockLocationProvider { locations, next: 0 }
    }

    /// Returns the next location of the rotation, cycling back to the start.
    pub fn next_location(&mut self) -> Option<MockLocation> {
        if self.locations.is_empty() {
            return None;
        }
        let loc = self.locations[self.next % self.locations.len()].clone();
        self.next += 1;
        Some(loc)
    }
}

/// Registry holding the currently installed location provider, if any.
///
/// Claimed exclusively by a fixture run between `install_mock` and `clear`.
#[derive(Default)]
pub struct LocationRegistry {
    provider: Option<MockLocationProvider>,
}

impl LocationRegistry {
    pub fn new() -> Self {
        LocationRegistry { provider: None }
    }

    /// Installs a mock provider serving the given rotation of locations.
    pub fn install_mock(&mut self, locations: Vec<MockLocation>) {
        tracing::debug!("Installing mock location provider ({} locations)", locations.len());
        self.provider = Some(MockLocationProvider::new(locations));
    }

    /// Removes the installed provider. Subsequent visits carry no location.
    pub fn clear(&mut self) {
        tracing::debug!("Clearing location provider registry");
        self.provider = None;
    }

    pub fn is_active(&self) -> bool {
        self.provider.is_some()
    }

    /// Location for the next visitor, None when no provider is installed.
    pub fn next_location(&mut self) -> Option<MockLocation> {
        match self.provider {
            Some(ref mut p) => p.next_location(),
            None => None,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::location::*;
    use crate::types::MockLocation;

    fn locations() -> Vec<MockLocation> {
        vec![
            MockLocation::new("Toronto", "ON", "CA").with_isp("comcast.net"),
            MockLocation::new("Nice", "PAC", "FR").with_isp("comcast.net"),
            MockLocation::new("Melbourne", "VIC", "AU").with_isp("awesomeisp.com"),
            MockLocation::new("Yokohama", "14", "JP"),
        ]
    }

    #[test]
    fn test_rotation_cycles() {
        let mut registry = LocationRegistry::new();
        registry.install_mock(locations());
        let cities: Vec<String> = (0..6)
            .map(|_| registry.next_location().unwrap().city)
            .collect();
        assert_eq!(
            cities,
            vec!["Toronto", "Nice", "Melbourne", "Yokohama", "Toronto", "Nice"]
        );
    }

    #[test]
    fn test_clear_stops_assignment() {
        let mut registry = LocationRegistry::new();
        registry.install_mock(locations());
        assert!(registry.is_active());
        assert!(registry.next_location().is_some());
        registry.clear();
        assert!(!registry.is_active());
        assert!(registry.next_location().is_none());
    }

    #[test]
    fn test_empty_registry_yields_nothing() {
        let mut registry = LocationRegistry::new();
        assert!(registry.next_location().is_none());
        registry.install_mock(Vec::new());
        assert!(registry.next_location().is_none());
    }

    #[test]
    fn test_reinstall_restarts_rotation() {
        let mut registry = LocationRegistry::new();
        registry.install_mock(locations());
        registry.next_location();
        registry.next_location();
        registry.install_mock(locations());
        assert_eq!(registry.next_location().unwrap().city, "Toronto");
    }
}
