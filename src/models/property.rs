use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{lenient, Favorite, Image, Message, Resource, User};
use crate::error::ValidationError;
use crate::sync::ParentScope;

/// Listing type, stored as a numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Apartment,
    Room,
    House,
    Townhouse,
}

impl PropertyKind {
    pub const ALL: [PropertyKind; 4] = [
        PropertyKind::Apartment,
        PropertyKind::Room,
        PropertyKind::House,
        PropertyKind::Townhouse,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(PropertyKind::Apartment),
            2 => Some(PropertyKind::Room),
            3 => Some(PropertyKind::House),
            4 => Some(PropertyKind::Townhouse),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            PropertyKind::Apartment => 1,
            PropertyKind::Room => 2,
            PropertyKind::House => 3,
            PropertyKind::Townhouse => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PropertyKind::Apartment => "Apartment",
            PropertyKind::Room => "Room",
            PropertyKind::House => "House",
            PropertyKind::Townhouse => "Townhouse",
        }
    }
}

impl std::str::FromStr for PropertyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<i64>() {
            return Self::from_code(code).ok_or_else(|| format!("unknown property type code {}", code));
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown property type '{}'", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "Property_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "User_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(rename = "Property_Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Property_Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Property_Address", default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "Property_City", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "Property_Zip_Code", default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(rename = "Property_Latitude", default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(rename = "Property_Longitude", default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(rename = "Property_Price_Per_Month", default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub price_per_month: Option<f64>,
    #[serde(rename = "Property_Num_Bedrooms", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub num_bedrooms: Option<i64>,
    #[serde(rename = "Property_Num_Bathrooms", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub num_bathrooms: Option<i64>,
    #[serde(rename = "Property_Square_Feet", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<i64>,
    #[serde(rename = "Property_Amenities", default, deserialize_with = "lenient::opt_list", skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
    #[serde(rename = "Property_Property_Type", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<i64>,
    #[serde(rename = "Property_Available_From", default, skip_serializing_if = "Option::is_none")]
    pub available_from: Option<String>,
    #[serde(rename = "Property_Available_To", default, skip_serializing_if = "Option::is_none")]
    pub available_to: Option<String>,
    #[serde(rename = "Property_Is_Active", default, deserialize_with = "lenient::opt_bool", skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(rename = "Property_CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "Property_UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(rename = "Property_DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<Favorite>>,
}

/// Parse the date part of `2024-05-01` or `2024-05-01T10:00:00.000Z`.
fn parse_day(text: &str) -> Option<NaiveDate> {
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn over_limit(value: Option<&str>, max: usize) -> bool {
    match value {
        Some(v) => v.trim().is_empty() || v.chars().count() > max,
        None => true,
    }
}

impl Property {
    pub fn kind(&self) -> Option<PropertyKind> {
        self.property_type.and_then(PropertyKind::from_code)
    }

    /// The image shown on cards: the one with display order 1.
    pub fn primary_image(&self) -> Option<&Image> {
        self.images
            .as_deref()?
            .iter()
            .find(|image| image.order == Some(1))
    }

    /// Images in display order; images without an order go last.
    pub fn gallery(&self) -> Vec<&Image> {
        let mut images: Vec<&Image> = self.images.iter().flatten().collect();
        images.sort_by_key(|image| image.order.unwrap_or(i64::MAX));
        images
    }

    /// Active, not deleted, and `day` falls inside the availability window.
    /// An open end of the window does not restrict.
    pub fn is_available_on(&self, day: NaiveDate) -> bool {
        if self.is_active == Some(false) || self.deleted_at.is_some() {
            return false;
        }
        let from_ok = self
            .available_from
            .as_deref()
            .and_then(parse_day)
            .map_or(true, |from| from <= day);
        let to_ok = self
            .available_to
            .as_deref()
            .and_then(parse_day)
            .map_or(true, |to| day <= to);
        from_ok && to_ok
    }
}

impl Resource for Property {
    const TABLE: &'static str = "properties";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();

        if over_limit(self.title.as_deref(), 255) {
            problems.push("Title is required and must be under 255 characters.".to_string());
        }
        if over_limit(self.address.as_deref(), 500) {
            problems.push("Address is required and must be under 500 characters.".to_string());
        }
        if over_limit(self.city.as_deref(), 255) {
            problems.push("City is required and must be under 255 characters.".to_string());
        }
        if over_limit(self.zip_code.as_deref(), 20) {
            problems.push("Zip code is required and must be under 20 characters.".to_string());
        }
        if self.price_per_month.map_or(true, |price| price <= 0.0) {
            problems.push("Monthly price must be greater than 0.".to_string());
        }
        if self.num_bedrooms.map_or(true, |n| n < 1) {
            problems.push("At least 1 bedroom is required.".to_string());
        }
        if self.num_bathrooms.map_or(true, |n| n < 1) {
            problems.push("At least 1 bathroom is required.".to_string());
        }

        ValidationError::check(problems)
    }

    fn parent_scope() -> Option<ParentScope> {
        Some(ParentScope::new("users", "User_ID"))
    }
}

/// Body of `PUT properties/{id}/availability`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    #[serde(rename = "Property_Available_From", skip_serializing_if = "Option::is_none")]
    pub available_from: Option<String>,
    #[serde(rename = "Property_Available_To", skip_serializing_if = "Option::is_none")]
    pub available_to: Option<String>,
    #[serde(rename = "Property_Is_Active", skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Listing search criteria. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Case-insensitive substring of the city
    pub city: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<i64>,
    pub min_bathrooms: Option<i64>,
    pub kind: Option<PropertyKind>,
}

impl SearchFilter {
    pub fn matches(&self, property: &Property) -> bool {
        let city_ok = match self.city.as_deref().filter(|c| !c.is_empty()) {
            Some(wanted) => property
                .city
                .as_deref()
                .is_some_and(|city| city.to_lowercase().contains(&wanted.to_lowercase())),
            None => true,
        };
        let price = property.price_per_month;
        let min_ok = self.min_price.map_or(true, |min| price.is_some_and(|p| p >= min));
        let max_ok = self.max_price.map_or(true, |max| price.is_some_and(|p| p <= max));
        let bedrooms_ok = self
            .min_bedrooms
            .map_or(true, |min| property.num_bedrooms.is_some_and(|n| n >= min));
        let bathrooms_ok = self
            .min_bathrooms
            .map_or(true, |min| property.num_bathrooms.is_some_and(|n| n >= min));
        let kind_ok = self.kind.map_or(true, |kind| property.kind() == Some(kind));

        city_ok && min_ok && max_ok && bedrooms_ok && bathrooms_ok && kind_ok
    }

    pub fn apply<'p>(&self, properties: &'p [Property]) -> Vec<&'p Property> {
        properties.iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing() -> Property {
        Property {
            title: Some("Sunny loft".into()),
            address: Some("1 Main St".into()),
            city: Some("Lisbon".into()),
            zip_code: Some("1000-001".into()),
            price_per_month: Some(1200.0),
            num_bedrooms: Some(2),
            num_bathrooms: Some(1),
            property_type: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(PropertyKind::from_code(4), Some(PropertyKind::Townhouse));
        assert_eq!(PropertyKind::from_code(9), None);
        assert_eq!("house".parse::<PropertyKind>(), Ok(PropertyKind::House));
        assert_eq!("2".parse::<PropertyKind>(), Ok(PropertyKind::Room));
        assert!("castle".parse::<PropertyKind>().is_err());
        assert_eq!(listing().kind().map(|k| k.label()), Some("Apartment"));
    }

    #[test]
    fn test_valid_listing() {
        assert!(listing().validate().is_ok());
    }

    #[test]
    fn test_invalid_listing_collects_every_problem() {
        let property = Property {
            title: Some("x".repeat(256)),
            zip_code: Some("123456789012345678901".into()),
            price_per_month: Some(0.0),
            num_bedrooms: Some(0),
            ..listing()
        };
        let err = property.validate().unwrap_err();
        assert_eq!(
            err.problems,
            vec![
                "Title is required and must be under 255 characters.",
                "Zip code is required and must be under 20 characters.",
                "Monthly price must be greater than 0.",
                "At least 1 bedroom is required.",
            ]
        );

        let err = Property::default().validate().unwrap_err();
        assert_eq!(err.problems.len(), 7);
    }

    #[test]
    fn test_primary_image_and_gallery() {
        let property: Property = serde_json::from_value(json!({
            "Property_ID": 1,
            "images": [
                {"Image_ID": 10, "Image_Order": 3},
                {"Image_ID": 11, "Image_Order": 1},
                {"Image_ID": 12},
                {"Image_ID": 13, "Image_Order": 2},
            ],
        }))
        .unwrap();

        assert_eq!(property.primary_image().and_then(|i| i.id), Some(11));
        let order: Vec<i64> = property.gallery().iter().filter_map(|i| i.id).collect();
        assert_eq!(order, vec![11, 13, 10, 12]);

        assert!(Property::default().primary_image().is_none());
        assert!(Property::default().gallery().is_empty());
    }

    #[test]
    fn test_availability_window() {
        let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let property = Property {
            available_from: Some("2024-05-01T00:00:00.000Z".into()),
            available_to: Some("2024-08-31".into()),
            is_active: Some(true),
            ..listing()
        };

        assert!(!property.is_available_on(day("2024-04-30")));
        assert!(property.is_available_on(day("2024-05-01")));
        assert!(property.is_available_on(day("2024-08-31")));
        assert!(!property.is_available_on(day("2024-09-01")));

        let inactive = Property {
            is_active: Some(false),
            ..property.clone()
        };
        assert!(!inactive.is_available_on(day("2024-06-01")));

        assert!(listing().is_available_on(day("2030-01-01")));
    }

    #[test]
    fn test_search_filter() {
        let porto = Property {
            city: Some("Porto".into()),
            price_per_month: Some(700.0),
            num_bedrooms: Some(1),
            property_type: Some(2),
            ..listing()
        };
        let properties = vec![listing(), porto];

        let filter = SearchFilter {
            city: Some("lis".into()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&properties).len(), 1);

        let filter = SearchFilter {
            max_price: Some(800.0),
            kind: Some(PropertyKind::Room),
            ..Default::default()
        };
        let found = filter.apply(&properties);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].city.as_deref(), Some("Porto"));

        let filter = SearchFilter {
            min_bedrooms: Some(2),
            min_price: Some(1000.0),
            min_bathrooms: Some(1),
            ..Default::default()
        };
        assert_eq!(filter.apply(&properties).len(), 1);

        assert_eq!(SearchFilter::default().apply(&properties).len(), 2);
    }
}
