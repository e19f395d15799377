pub mod activity;
pub mod event;
pub mod organization;
pub mod product;
pub mod promo;
pub mod stripe_event;
pub mod user;

pub use activity::ActivityLogRepository;
pub use event::EventRepository;
pub use organization::OrganizationRepository;
pub use product::ProductRepository;
pub use promo::PromoCodeRepository;
pub use stripe_event::StripeEventRepository;
pub use user::UserRepository;
