/// Easing curves.
pub mod ease;
/// Entrance/exit evaluation for layout v2 elements.
pub mod element;
