use sg_data::AnnotationMap;

/// Trait for whatever draws a module's annotations
///
/// The module calls `render` after every committed change and `set_busy`
/// whenever its busy flag flips. Both run synchronously on the thread that
/// made the change and must not block.
pub trait AnnotationRenderer: Send + Sync {
    /// Draw the full annotation state
    fn render(&self, annotations: &AnnotationMap);

    /// Show or hide a loading indicator
    fn set_busy(&self, _busy: bool) {
        // Default implementation does nothing
    }
}
