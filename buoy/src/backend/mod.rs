//! Middleware implementations, one per ROS2 client library.

#[cfg(feature = "ros2-native")]
pub mod native;

#[cfg(feature = "ros2-c")]
pub mod rcl;
