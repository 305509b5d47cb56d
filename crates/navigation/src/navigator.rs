use formats::{FeatureError, MarkerFeature};
use foundation::{LatLng, LatLngBounds};
use layers::{CountryLayerManager, MapView, MarkerError, MarkerLayerManager, MarkerSerial};
use runtime::Scheduler;

use crate::camera::{CameraSettings, CameraTarget, Completion};

/// Deferred request to show a marker's popup.
///
/// Names the marker by serial, so edits to the list before the task runs
/// cannot redirect it to another marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpenPopup {
    pub marker: MarkerSerial,
}

/// Everything a navigation step reads or drives.
pub struct NavContext<'a> {
    pub markers: &'a MarkerLayerManager,
    pub countries: &'a CountryLayerManager,
    pub view: &'a mut dyn MapView,
    pub popups: &'a mut Scheduler<OpenPopup>,
}

/// Cursor over the marker list plus the camera moves that go with it.
#[derive(Debug, Default)]
pub struct Navigator {
    cursor: Option<usize>,
    settings: CameraSettings,
}

fn empty() -> MarkerError {
    MarkerError::IndexOutOfRange { index: 0, len: 0 }
}

impl Navigator {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            cursor: None,
            settings,
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// `None` until the first `zoom_next`/`zoom_prev`.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Moves the cursor forward, wrapping to 0 past the end.
    pub fn advance(&mut self, len: usize) -> Result<usize, MarkerError> {
        if len == 0 {
            return Err(empty());
        }
        let next = match self.cursor {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.cursor = Some(next);
        Ok(next)
    }

    /// Moves the cursor back, wrapping to the last marker before 0.
    pub fn retreat(&mut self, len: usize) -> Result<usize, MarkerError> {
        if len == 0 {
            return Err(empty());
        }
        let prev = match self.cursor {
            Some(i) if i > 0 => (i - 1).min(len - 1),
            _ => len - 1,
        };
        self.cursor = Some(prev);
        Ok(prev)
    }

    /// Advances, reports the newly selected marker through `emit`, then
    /// zooms to it.
    pub fn zoom_next(
        &mut self,
        ctx: NavContext<'_>,
        completion: Option<Completion>,
        emit: impl FnOnce(&MarkerFeature),
    ) -> Result<usize, MarkerError> {
        let index = self.advance(ctx.markers.len())?;
        self.emit_and_zoom(index, ctx, completion, emit)
    }

    pub fn zoom_prev(
        &mut self,
        ctx: NavContext<'_>,
        completion: Option<Completion>,
        emit: impl FnOnce(&MarkerFeature),
    ) -> Result<usize, MarkerError> {
        let index = self.retreat(ctx.markers.len())?;
        self.emit_and_zoom(index, ctx, completion, emit)
    }

    fn emit_and_zoom(
        &mut self,
        index: usize,
        ctx: NavContext<'_>,
        completion: Option<Completion>,
        emit: impl FnOnce(&MarkerFeature),
    ) -> Result<usize, MarkerError> {
        if let Some(feature) = ctx.markers.features().get(index) {
            emit(feature);
        }
        self.zoom_at(index, ctx, completion)?;
        Ok(index)
    }

    /// Points the camera at marker `index` and schedules its popup for the
    /// next tick.
    ///
    /// A marker tied to a known country frames the country; otherwise the
    /// camera centers on the marker itself.
    pub fn zoom_at(
        &mut self,
        index: usize,
        ctx: NavContext<'_>,
        completion: Option<Completion>,
    ) -> Result<CameraTarget, MarkerError> {
        let NavContext {
            markers,
            countries,
            view,
            popups,
        } = ctx;
        let out_of_range = || MarkerError::IndexOutOfRange {
            index,
            len: markers.len(),
        };
        let feature = markers.find_by_index(index).ok_or_else(out_of_range)?;
        let marker = markers.serial_of(index).ok_or_else(out_of_range)?;

        let target = Self::target_for(feature, countries)
            .ok_or(MarkerError::InvalidFeature(FeatureError::MissingGeometry))?;

        popups.defer(OpenPopup { marker });
        tracing::debug!(index, "popup open deferred");

        match target {
            CameraTarget::Bounds(bounds) => {
                if let Some(completion) = completion {
                    let (event, handler) = completion.into_parts();
                    view.once(&event, handler);
                }
                let animate = self.settings.zoom_level != view.zoom();
                tracing::debug!(index, ?bounds, "fitting country bounds");
                view.fit_bounds(bounds, self.settings.fit_options(animate));
            }
            CameraTarget::Point(at) => {
                self.set_camera_target(at, view, completion);
            }
        }
        Ok(target)
    }

    fn target_for(feature: &MarkerFeature, countries: &CountryLayerManager) -> Option<CameraTarget> {
        if let Some(code) = &feature.properties.country {
            match countries.country_bounds(code) {
                Some(bounds) => return Some(CameraTarget::Bounds(bounds)),
                None => tracing::warn!(code = %code, "unknown country code, centering on marker"),
            }
        }
        feature.lat_lng().map(CameraTarget::Point)
    }

    /// Centers the camera so `position` lands offset by the top-left padding.
    ///
    /// When the view is already there the move is skipped and `completion`
    /// runs immediately. Returns whether a camera command was issued.
    pub fn set_camera_target(
        &self,
        position: LatLng,
        view: &mut dyn MapView,
        completion: Option<Completion>,
    ) -> bool {
        let zoom = self.settings.zoom_level;
        let point = view.project(position, zoom) - self.settings.padding_top_left;
        let target = view.unproject(point, zoom);

        if view.center().is_some_and(|c| c.approx_eq(target)) {
            tracing::debug!(?target, "camera already at target");
            if let Some(completion) = completion {
                completion.run_now();
            }
            return false;
        }

        if let Some(completion) = completion {
            let (event, handler) = completion.into_parts();
            view.once(&event, handler);
        }
        let options = self.settings.view_options(view.zoom());
        tracing::debug!(?target, zoom, "camera move");
        view.set_view(target, zoom, options);
        true
    }

    /// Fits the camera to every marker. Returns `false` when there is nothing to fit.
    pub fn zoom_all(&self, markers: &MarkerLayerManager, view: &mut dyn MapView) -> bool {
        self.fit(markers.bounds(), view, "markers")
    }

    pub fn zoom_to_countries(&self, countries: &CountryLayerManager, view: &mut dyn MapView) -> bool {
        self.fit(countries.bounds(), view, "countries")
    }

    pub fn zoom_to_highlighted(
        &self,
        countries: &CountryLayerManager,
        view: &mut dyn MapView,
    ) -> bool {
        self.fit(countries.highlighted_bounds(), view, "highlighted countries")
    }

    fn fit(
        &self,
        bounds: Option<LatLngBounds>,
        view: &mut dyn MapView,
        what: &str,
    ) -> bool {
        let Some(bounds) = bounds else {
            tracing::debug!(what, "nothing to fit");
            return false;
        };
        view.fit_bounds(bounds, self.settings.fit_options(true));
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{NavContext, Navigator, OpenPopup};
    use crate::camera::{CameraSettings, CameraTarget, Completion};
    use formats::{FeatureCollection, MarkerInput, MarkerSpec, NoDescriptions};
    use foundation::LatLng;
    use foundation::math::Vec2;
    use layers::{
        CameraCommand, CountryLayerManager, HeadlessView, MOVE_END, MapView, MarkerError,
        MarkerLayerManager,
    };
    use pretty_assertions::assert_eq;
    use runtime::Scheduler;
    use serde_json::json;

    struct Fixture {
        markers: MarkerLayerManager,
        countries: CountryLayerManager,
        view: HeadlessView,
        popups: Scheduler<OpenPopup>,
    }

    impl Fixture {
        fn new(inputs: &[MarkerInput]) -> Self {
            let mut view = HeadlessView::new(800.0, 600.0);
            let mut markers = MarkerLayerManager::default();
            markers
                .add_markers(inputs, &NoDescriptions, &mut view)
                .expect("add");
            Self {
                markers,
                countries: CountryLayerManager::default(),
                view,
                popups: Scheduler::new(),
            }
        }

        fn ctx(&mut self) -> NavContext<'_> {
            NavContext {
                markers: &self.markers,
                countries: &self.countries,
                view: &mut self.view,
                popups: &mut self.popups,
            }
        }
    }

    fn three() -> Vec<MarkerInput> {
        vec![
            MarkerSpec::at(53.0, 10.0).with_title("a").into(),
            MarkerSpec::at(48.0, 2.0).with_title("b").into(),
            MarkerSpec::at(41.0, 12.0).with_title("c").into(),
        ]
    }

    #[test]
    fn zoom_next_wraps_after_full_cycle() {
        let mut fx = Fixture::new(&three());
        let mut nav = Navigator::default();
        let mut last = None;
        for _ in 0..3 {
            nav.zoom_next(fx.ctx(), None, |f| last = Some(f.properties.index))
                .expect("next");
        }
        assert_eq!(last, Some(2));
        assert_eq!(nav.cursor(), Some(2));

        nav.zoom_next(fx.ctx(), None, |_| {}).expect("next");
        assert_eq!(nav.cursor(), Some(0));
    }

    #[test]
    fn zoom_prev_from_start_lands_on_last() {
        let mut fx = Fixture::new(&three());
        let mut nav = Navigator::default();
        let index = nav.zoom_prev(fx.ctx(), None, |_| {}).expect("prev");
        assert_eq!(index, 2);
        assert_eq!(nav.zoom_prev(fx.ctx(), None, |_| {}), Ok(1));
    }

    #[test]
    fn empty_marker_list_is_an_error() {
        let mut fx = Fixture::new(&[]);
        let mut nav = Navigator::default();
        assert_eq!(
            nav.zoom_next(fx.ctx(), None, |_| {}),
            Err(MarkerError::IndexOutOfRange { index: 0, len: 0 })
        );
        assert_eq!(nav.cursor(), None);
    }

    #[test]
    fn stale_cursor_is_clamped() {
        let mut nav = Navigator::default();
        nav.advance(5).expect("advance");
        nav.advance(5).expect("advance");
        nav.advance(5).expect("advance");
        assert_eq!(nav.cursor(), Some(2));
        assert_eq!(nav.retreat(1), Ok(0));
        assert_eq!(nav.advance(1), Ok(0));
    }

    #[test]
    fn zoom_at_defers_popup_and_waits_for_moveend() {
        let mut fx = Fixture::new(&three());
        let nav_settings = CameraSettings {
            zoom_level: 6.0,
            ..CameraSettings::default()
        };
        let mut nav = Navigator::new(nav_settings);
        let done = Rc::new(RefCell::new(0));
        let d = Rc::clone(&done);

        let target = nav
            .zoom_at(1, fx.ctx(), Some(Completion::new(move |_| *d.borrow_mut() += 1)))
            .expect("zoom");
        assert_eq!(target, CameraTarget::Point(LatLng::new(48.0, 2.0)));
        assert_eq!(*done.borrow(), 0);
        assert_eq!(fx.popups.pending_count(), 1);

        fx.view.finish_animations();
        assert_eq!(*done.borrow(), 1);
        let marker = fx.markers.serial_of(1).expect("serial");
        assert_eq!(fx.popups.advance(), vec![OpenPopup { marker }]);
        assert_eq!(fx.view.zoom(), 6.0);
    }

    #[test]
    fn zoom_at_unknown_index_fails() {
        let mut fx = Fixture::new(&three());
        let mut nav = Navigator::default();
        assert_eq!(
            nav.zoom_at(7, fx.ctx(), None),
            Err(MarkerError::IndexOutOfRange { index: 7, len: 3 })
        );
        assert!(fx.popups.is_idle());
    }

    #[test]
    fn repeated_target_skips_move_but_completes() {
        let mut fx = Fixture::new(&three());
        let nav = Navigator::default();
        let at = LatLng::new(48.0, 2.0);
        assert!(nav.set_camera_target(at, &mut fx.view, None));
        fx.view.finish_animations();

        let done = Rc::new(RefCell::new(false));
        let d = Rc::clone(&done);
        let moved = nav.set_camera_target(
            at,
            &mut fx.view,
            Some(Completion::new(move |e| *d.borrow_mut() = e.name == MOVE_END)),
        );
        assert!(!moved);
        assert!(*done.borrow());
        assert_eq!(fx.view.commands().len(), 1);
    }

    #[test]
    fn padding_offsets_the_center() {
        let mut fx = Fixture::new(&[]);
        let nav = Navigator::new(CameraSettings {
            padding_top_left: Vec2::new(100.0, 50.0),
            ..CameraSettings::default()
        });
        let at = LatLng::new(48.0, 2.0);
        nav.set_camera_target(at, &mut fx.view, None);

        let center = fx.view.center().expect("center");
        let zoom = nav.settings().zoom_level;
        let offset = fx.view.project(at, zoom) - fx.view.project(center, zoom);
        assert!((offset.x - 100.0).abs() < 1e-6);
        assert!((offset.y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn country_marker_fits_country_bounds() {
        let mut fx = Fixture::new(&[MarkerSpec::at(51.0, 10.0).with_country("DEU").into()]);
        let data = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature", "id": "DEU", "properties": {},
                "geometry": { "type": "Polygon",
                              "coordinates": [[[6.0, 47.0], [15.0, 47.0], [15.0, 55.0], [6.0, 47.0]]] }
            }]
        });
        let data = FeatureCollection::from_geojson_value(&data).expect("geojson");
        fx.countries.add_country_data(data, &mut fx.view);

        let mut nav = Navigator::default();
        let target = nav.zoom_at(0, fx.ctx(), None).expect("zoom");
        let CameraTarget::Bounds(bounds) = target else {
            panic!("expected bounds target, got {target:?}");
        };
        assert!(bounds.contains(LatLng::new(51.0, 10.0)));
        assert!(matches!(
            fx.view.last_command(),
            Some(CameraCommand::FitBounds { .. })
        ));
    }

    #[test]
    fn unknown_country_falls_back_to_point() {
        let mut fx = Fixture::new(&[MarkerSpec::at(51.0, 10.0).with_country("XXX").into()]);
        let mut nav = Navigator::default();
        let target = nav.zoom_at(0, fx.ctx(), None).expect("zoom");
        assert_eq!(target, CameraTarget::Point(LatLng::new(51.0, 10.0)));
    }

    #[test]
    fn zoom_all_needs_something_to_fit() {
        let mut fx = Fixture::new(&three());
        let nav = Navigator::default();
        assert!(nav.zoom_all(&fx.markers, &mut fx.view));
        assert!(!nav.zoom_to_countries(&fx.countries, &mut fx.view));
        assert!(!nav.zoom_to_highlighted(&fx.countries, &mut fx.view));
    }
}
