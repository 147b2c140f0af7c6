pub mod camera;
pub mod pointer;

pub use camera::CameraState;
pub use hit_test::PartRegistry;
pub use pointer::{ClassifierUpdate, Gesture, GestureMode, HitTester, PointerClassifier, PointerInput};
