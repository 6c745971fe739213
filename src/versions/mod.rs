mod add_min_max_seats_to_seat_pricing;

use crate::revision::record::Migration;

/// Every migration script shipped with this crate, in authoring order.
pub fn migrations() -> Vec<Box<dyn Migration>> {
    vec![Box::new(add_min_max_seats_to_seat_pricing::AddMinMaxSeatsToSeatPricing)]
}
