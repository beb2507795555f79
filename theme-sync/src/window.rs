use std::rc::Rc;

use frontend_observer::Destructor;
use frontend_platform::DarkModeQuery;

use crate::ColorScheme;

/// The OS/browser color scheme
#[derive(Clone)]
pub struct WindowService {
    query: Rc<dyn DarkModeQuery>,
}

impl WindowService {
    pub fn new(query: Rc<dyn DarkModeQuery>) -> Self {
        WindowService { query }
    }

    pub fn color_scheme(&self) -> ColorScheme {
        ColorScheme::from_prefers_dark(self.query.prefers_dark())
    }

    pub fn on_color_scheme_change(&self, callback: impl Fn(ColorScheme) + 'static) -> Destructor {
        self.query
            .on_preference_change(Rc::new(move |dark: bool| callback(ColorScheme::from_prefers_dark(dark))))
    }
}

impl std::fmt::Debug for WindowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowService")
            .field("color_scheme", &self.color_scheme())
            .finish()
    }
}
