//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block body
///
/// # Example
///
/// ```rust,ignore
/// use resort_booking_core::async_effect;
///
/// async_effect! {
///     match inventory.mark_unavailable(&room_id, None).await {
///         Ok(room) => Some(ReservationAction::RoomReserved { room }),
///         Err(error) => Some(ReservationAction::ReservationFailed {
///             room_id,
///             reason: error.to_string(),
///         }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use resort_booking_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(4),
///     action: ReservationAction::FeedbackDue
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create a delayed action that can be cancelled by id
///
/// # Example
///
/// ```rust,ignore
/// use resort_booking_core::timer;
///
/// timer! {
///     id: FEEDBACK_PROMPT_TIMER,
///     duration: delay,
///     action: ReservationAction::FeedbackDue
/// }
/// ```
#[macro_export]
macro_rules! timer {
    (
        id: $id:expr,
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($crate::delay! {
                duration: $duration,
                action: $action
            }),
        }
    };
}
