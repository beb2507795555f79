use std::rc::Rc;

use frontend_observer::Destructor;
use leptos::prelude::*;
use route_service::{RouteService, RouteServiceEvent};
use theme_sync::{ColorScheme, ThemeService, ThemeServiceEvent};
use window_size::{WindowSizeService, WindowSizeServiceEvent};

/// Unregister when the current reactive owner is cleaned up.
///
/// `Destructor` is not `Send`, so it is parked in local arena storage and
/// only the handle moves into the cleanup closure.
fn unregister_on_cleanup(destructor: Destructor) {
    let listener = StoredValue::new_local(Some(destructor));
    on_cleanup(move || {
        if let Some(Some(destructor)) = listener.try_update_value(Option::take) {
            destructor.call();
        }
    });
}

/// Current color scheme as a signal
pub fn use_color_scheme(theme: &ThemeService) -> ReadSignal<ColorScheme> {
    let (scheme, set_scheme) = signal(theme.color_scheme());
    let listener = theme.on(ThemeServiceEvent::ColorSchemeChanged, move |_, value| {
        // Signal may already be disposed
        set_scheme.try_set(value);
    });
    unregister_on_cleanup(listener);
    scheme
}

/// `(innerWidth, innerHeight)`, updated after resizing settles
pub fn use_window_size(window_size: &WindowSizeService) -> ReadSignal<Option<(f64, f64)>> {
    let (size, set_size) = signal(window_size.size());
    let service = window_size.clone();
    let listener = window_size.on(WindowSizeServiceEvent::Resized, move |_| {
        set_size.try_set(service.size());
    });
    unregister_on_cleanup(listener);
    size
}

/// Calls `on_push` for the route requested before mount, if any, then for
/// every pushed route.
pub fn use_route_push(routes: &RouteService, on_push: impl Fn(String) + 'static) {
    let on_push = Rc::new(on_push);
    if let Some(route) = routes.take_next_history() {
        on_push(route);
    }
    let listener = routes.on(RouteServiceEvent::PushHistory, move |_, route| on_push(route.to_string()));
    unregister_on_cleanup(listener);
}
