use tracing::debug;

use crate::config::WindowConfig;

/// Presentation record for the floating console window.
///
/// Purely cosmetic: nothing here affects the machine. Operations that change
/// the container size return `true` when the terminal should be re-fitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    pub visible: bool,
    pub minimized: bool,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Named visibility values accepted from host menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Show,
    Hide,
}

impl Visibility {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "show" => Some(Visibility::Show),
            "hide" => Some(Visibility::Hide),
            _ => None,
        }
    }
}

impl WindowState {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            visible: false,
            minimized: false,
            x: config.x,
            y: config.y,
            width: config.width,
            height: config.height,
        }
    }

    pub fn show(&mut self, x: i32, y: i32, width: u32, height: u32) -> bool {
        debug!("Showing window at {},{} ({}x{})", x, y, width, height);
        self.visible = true;
        self.minimized = false;
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        true
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn minimize(&mut self) {
        self.minimized = true;
    }

    pub fn maximize(&mut self, config: &WindowConfig) -> bool {
        self.visible = true;
        self.minimized = false;
        self.x = 50;
        self.y = 50;
        self.width = config.maximized_width;
        self.height = config.maximized_height;
        true
    }

    /// Show (keeping the current geometry) or hide.
    pub fn set_visibility(&mut self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Show => {
                let (x, y, w, h) = (self.x, self.y, self.width, self.height);
                self.show(x, y, w, h)
            }
            Visibility::Hide => {
                self.hide();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_and_hide() {
        let config = WindowConfig::default();
        let mut window = WindowState::new(&config);
        assert!(!window.visible);

        window.minimize();
        assert!(window.show(10, 20, 640, 480));
        assert!(window.visible);
        assert!(!window.minimized);
        assert_eq!((window.x, window.y, window.width, window.height), (10, 20, 640, 480));

        window.hide();
        assert!(!window.visible);
        assert_eq!(window.width, 640);
    }

    #[test]
    fn test_maximize_uses_configured_size() {
        let config = WindowConfig::default();
        let mut window = WindowState::new(&config);
        window.show(300, 300, 100, 100);

        assert!(window.maximize(&config));
        assert_eq!((window.x, window.y), (50, 50));
        assert_eq!((window.width, window.height), (1728, 972));
    }

    #[test]
    fn test_visibility_names() {
        assert_eq!(Visibility::parse("Show"), Some(Visibility::Show));
        assert_eq!(Visibility::parse(" hide "), Some(Visibility::Hide));
        assert_eq!(Visibility::parse("toggle"), None);

        let mut window = WindowState::new(&WindowConfig::default());
        assert!(window.set_visibility(Visibility::Show));
        assert_eq!((window.x, window.y, window.width), (50, 50, 900));
        assert!(!window.set_visibility(Visibility::Hide));
        assert!(!window.visible);
    }
}
