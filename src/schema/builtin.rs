//! Descriptors for the tables cached by the rental client.

use super::ResourceSchema;

pub fn users() -> ResourceSchema {
    ResourceSchema::new("users", "user", "User_ID")
        .text("User_First_Name")
        .text("User_Last_Name")
        .text("User_Email")
        .text("User_Password")
        .text("User_Role")
        .text("User_Profile_Picture")
        .text("User_Address")
        .text("User_Phone_Number")
        .text("User_CreatedAt")
        .text("User_UpdatedAt")
        .text("User_DeletedAt")
        .has_many("properties", "properties", "User_ID")
        .has_many("messagesSent", "messages", "Sender_ID")
        .has_many("messagesReceived", "messages", "Receiver_ID")
        .has_many("favorites", "favorites", "Tenant_ID")
}

pub fn properties() -> ResourceSchema {
    ResourceSchema::new("properties", "property", "Property_ID")
        .integer("User_ID")
        .text("Property_Title")
        .text("Property_Description")
        .text("Property_Address")
        .text("Property_City")
        .text("Property_Zip_Code")
        .real("Property_Latitude")
        .real("Property_Longitude")
        .real("Property_Price_Per_Month")
        .integer("Property_Num_Bedrooms")
        .integer("Property_Num_Bathrooms")
        .integer("Property_Square_Feet")
        .json("Property_Amenities")
        .integer("Property_Property_Type")
        .text("Property_Available_From")
        .text("Property_Available_To")
        .boolean("Property_Is_Active")
        .text("Property_CreatedAt")
        .text("Property_UpdatedAt")
        .text("Property_DeletedAt")
        .belongs_to("user", "users", "User_ID", "User_ID")
        .has_many_ordered("images", "images", "Property_ID", "Image_Order")
        .has_many("messages", "messages", "Property_ID")
        .has_many("favorites", "favorites", "Property_ID")
        .with_sidecars()
}

pub fn images() -> ResourceSchema {
    ResourceSchema::new("images", "image", "Image_ID")
        .integer("Property_ID")
        .text("Image_Name")
        .text("Image_Path")
        .text("Image_Type")
        .text("Image_URL")
        .integer("Image_Order")
        .text("Image_CreatedAt")
        .text("Image_UpdatedAt")
        .text("Image_DeletedAt")
        .belongs_to("property", "properties", "Property_ID", "Property_ID")
}

pub fn favorites() -> ResourceSchema {
    ResourceSchema::new("favorites", "favorite", "Favorite_ID")
        .integer("Tenant_ID")
        .integer("Property_ID")
        .text("Favorite_CreatedAt")
        .text("Favorite_UpdatedAt")
        .text("Favorite_DeletedAt")
        .belongs_to("tenant", "users", "Tenant_ID", "User_ID")
        .belongs_to("property", "properties", "Property_ID", "Property_ID")
}

pub fn messages() -> ResourceSchema {
    ResourceSchema::new("messages", "message", "Message_ID")
        .integer("Sender_ID")
        .integer("Receiver_ID")
        .integer("Property_ID")
        .text("Message_Text")
        .text("Message_Read_At")
        .text("Message_CreatedAt")
        .text("Message_UpdatedAt")
        .text("Message_DeletedAt")
        .belongs_to("sender", "users", "Sender_ID", "User_ID")
        .belongs_to("receiver", "users", "Receiver_ID", "User_ID")
        .belongs_to("property", "properties", "Property_ID", "Property_ID")
        .with_sidecars()
}
