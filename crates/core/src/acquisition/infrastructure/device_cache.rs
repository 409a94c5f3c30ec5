use std::cell::RefCell;
use std::collections::HashMap;

/// SDK device handles from the last enumeration, keyed by serial number.
///
/// A handle is taken out when its device is opened, so a second open of the
/// same serial goes back to the SDK instead of reusing a stale handle.
pub struct DeviceCache<H> {
    handles: RefCell<HashMap<String, H>>,
}

impl<H> Default for DeviceCache<H> {
    fn default() -> Self {
        Self {
            handles: RefCell::new(HashMap::new()),
        }
    }
}

impl<H> DeviceCache<H> {
    /// Replaces the cached handles with a fresh enumeration.
    pub fn fill(&self, handles: impl IntoIterator<Item = (String, H)>) {
        let mut cache = self.handles.borrow_mut();
        cache.clear();
        cache.extend(handles);
    }

    /// Takes the handle for `serial`, enumerating again only on a cache miss.
    pub fn take_or_refresh<E>(
        &self,
        serial: &str,
        refresh: impl FnOnce() -> Result<Vec<(String, H)>, E>,
    ) -> Result<Option<H>, E> {
        let cached = self.handles.borrow_mut().remove(serial);
        if cached.is_some() {
            return Ok(cached);
        }
        log::debug!("Device {serial} not cached, enumerating again");
        self.fill(refresh()?);
        Ok(self.handles.borrow_mut().remove(serial))
    }
}
