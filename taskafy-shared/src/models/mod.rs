/// Database rows and their queries
///
/// - `user`: accounts, tasker profiles, tasker search
/// - `category`: seeded service catalogue
/// - `task`: bookings and the lifecycle state machine
/// - `application`: tasker applications to posted tasks
/// - `review`: reviews and rating aggregation
/// - `location`: last tasker position per task
/// - `payment`: cash ledger, payment method and status enums
/// - `paydunya`: gateway invoices and the IPN log
/// - `message`, `notification`: communication
/// - `dispute`, `coin`, `favorite`, `recurring`: engagement features

pub mod application;
pub mod category;
pub mod coin;
pub mod dispute;
pub mod favorite;
pub mod location;
pub mod message;
pub mod notification;
pub mod paydunya;
pub mod payment;
pub mod recurring;
pub mod review;
pub mod task;
pub mod user;
