use super::host::PageHost;

const ROTATION_STEP_DEG: u16 = 3;

/// Floating "still scanning" spinner. Cosmetic only.
#[derive(Debug, Clone, Default)]
pub struct ScanIndicator {
    shown: bool,
    rotation_deg: u16,
}

impl ScanIndicator {
    pub fn tick<H: PageHost>(&mut self, host: &mut H) {
        if !self.shown {
            self.shown = true;
            host.show_indicator(self.rotation_deg);
            return;
        }
        self.rotation_deg = (self.rotation_deg + ROTATION_STEP_DEG) % 360;
        host.update_indicator(self.rotation_deg);
    }

    pub fn remove<H: PageHost>(&mut self, host: &mut H) {
        if self.shown {
            self.shown = false;
            host.remove_indicator();
        }
    }
}
