diesel::table! {
    boxes (id) {
        id -> Integer,
        box_identifier -> Text,
        location -> Text,
    }
}

diesel::table! {
    items (id) {
        id -> Integer,
        box_id -> Integer,
        name -> Text,
        category -> Text,
        description -> Nullable<Text>,
        price -> Nullable<Double>,
        image -> Nullable<Text>,
    }
}

diesel::joinable!(items -> boxes (box_id));

diesel::allow_tables_to_appear_in_same_query!(
    boxes,
    items,
);
