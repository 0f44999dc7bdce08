//! Bluetooth connection indicator

/// Source of connection state changes
pub trait BluetoothMonitor {
    /// Whether a companion device is currently connected
    fn peek(&self) -> bool;

    /// Start delivering connection change events
    fn subscribe(&mut self);

    /// Stop delivering connection change events
    fn unsubscribe(&mut self);
}

/// The icon is shown only while connected and not hidden by the user.
pub fn indicator_visible(connected: bool, hidden: bool) -> bool {
    connected && !hidden
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_needs_connection_and_permission() {
        assert!(indicator_visible(true, false));
        assert!(!indicator_visible(true, true));
        assert!(!indicator_visible(false, false));
        assert!(!indicator_visible(false, true));
    }
}
