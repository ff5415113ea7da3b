use uuid::Uuid;

use crate::models::{Booking, Campaign, CampaignStatus, ModelProfile, Role};

/// The authenticated caller, as far as access decisions are concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
}

impl Viewer {
    pub fn new(user_id: Uuid, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    #[inline]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn has_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }
}

/// Which side of a booking the viewer is acting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingActor {
    Client,
    ModelSide,
    Admin,
}

/// Brands and agencies book models; admins may book on anyone's behalf
pub fn can_book(viewer: &Viewer) -> bool {
    viewer.has_any(&[Role::Brand, Role::Agency, Role::Admin])
}

/// The model themself, the owner of the model's agency, or an admin
pub fn can_manage_model(viewer: &Viewer, model: &ModelProfile, owned_agencies: &[Uuid]) -> bool {
    if viewer.is_admin() || model.user_id == viewer.user_id {
        return true;
    }
    model
        .agency_id
        .map(|agency| owned_agencies.contains(&agency))
        .unwrap_or(false)
}

pub fn can_view_booking(viewer: &Viewer, booking: &Booking, owned_agencies: &[Uuid]) -> bool {
    booking_actor(viewer, booking, owned_agencies).is_some()
}

/// Classify the viewer's relationship to a booking
///
/// Admin wins over any other relationship; a user who is both client and
/// model on the same booking acts as the client.
pub fn booking_actor(viewer: &Viewer, booking: &Booking, owned_agencies: &[Uuid]) -> Option<BookingActor> {
    if viewer.is_admin() {
        return Some(BookingActor::Admin);
    }
    if booking.client_id == viewer.user_id {
        return Some(BookingActor::Client);
    }
    if booking.model_user_id == viewer.user_id {
        return Some(BookingActor::ModelSide);
    }
    match booking.agency_id {
        Some(agency) if owned_agencies.contains(&agency) => Some(BookingActor::ModelSide),
        _ => None,
    }
}

pub fn can_create_campaign(viewer: &Viewer) -> bool {
    viewer.has_any(&[Role::Brand, Role::Admin])
}

/// Open campaigns are public; drafts and closed ones stay with their brand
pub fn can_view_campaign(viewer: &Viewer, campaign: &Campaign) -> bool {
    campaign.status == CampaignStatus::Open
        || campaign.brand_id == viewer.user_id
        || viewer.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use chrono::Utc;

    fn booking(client: Uuid, model_user: Uuid, agency: Option<Uuid>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            model_id: Uuid::new_v4(),
            model_user_id: model_user,
            agency_id: agency,
            client_id: client,
            starts_at: Utc::now(),
            ends_at: Utc::now(),
            location: None,
            fee_minor: 10_000,
            currency: "INR".to_string(),
            notes: None,
            status: BookingStatus::Pending,
            created_at: None,
        }
    }

    #[test]
    fn test_booking_actor_roles() {
        let client = Uuid::new_v4();
        let model_user = Uuid::new_v4();
        let agency = Uuid::new_v4();
        let b = booking(client, model_user, Some(agency));

        let as_client = Viewer::new(client, vec![Role::Brand]);
        let as_model = Viewer::new(model_user, vec![Role::Model]);
        let as_agency = Viewer::new(Uuid::new_v4(), vec![Role::Agency]);
        let stranger = Viewer::new(Uuid::new_v4(), vec![Role::Brand]);
        let admin = Viewer::new(Uuid::new_v4(), vec![Role::Admin]);

        assert_eq!(booking_actor(&as_client, &b, &[]), Some(BookingActor::Client));
        assert_eq!(booking_actor(&as_model, &b, &[]), Some(BookingActor::ModelSide));
        assert_eq!(booking_actor(&as_agency, &b, &[agency]), Some(BookingActor::ModelSide));
        assert_eq!(booking_actor(&as_agency, &b, &[]), None);
        assert!(!can_view_booking(&stranger, &b, &[]));
        assert_eq!(booking_actor(&admin, &b, &[]), Some(BookingActor::Admin));
    }

    #[test]
    fn test_models_cannot_book() {
        assert!(!can_book(&Viewer::new(Uuid::new_v4(), vec![Role::Model])));
        assert!(can_book(&Viewer::new(Uuid::new_v4(), vec![Role::Model, Role::Brand])));
        assert!(!can_book(&Viewer::new(Uuid::new_v4(), vec![])));
    }
}
