diesel::table! {
    tickets (id) {
        id -> Uuid,
        token -> Text,
        reporter_id -> Uuid,
        branch -> Text,
        description -> Text,
        classification -> Text,
        severity -> Text,
        status -> Text,
        tech_notes -> Nullable<Text>,
        assigned_to -> Nullable<Uuid>,
        solved_by -> Nullable<Uuid>,
        solved_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    user_profiles (user_id) {
        user_id -> Uuid,
        full_name -> Text,
        branch -> Text,
        role -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(tickets, user_profiles);
