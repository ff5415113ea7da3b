// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Agency, Booking, BookingStatus, Campaign, CampaignStatus, Commission, Favorite, Message,
    ModelProfile, NewBooking, NewCampaign, NewCommission, NewMessage, NewNotification,
    NewPayment, NewPortfolioImage, Notification, Payment, PaymentMethod, PaymentStatus,
    PortfolioImage, Role, UserProfile, UserRole,
};
pub use requests::{
    AddPortfolioImageRequest, CheckoutRequest, CreateBookingRequest, CreateCampaignRequest,
    ModelSearchQuery, NotificationQuery, PageQuery, ReorderPortfolioRequest,
    RoleAssignmentRequest, SendMessageRequest, UpdateBookingStatusRequest, UpdateModelRequest,
};
pub use responses::{AdminUserView, CheckoutResponse, ErrorResponse, HealthResponse, ReorderResponse};
