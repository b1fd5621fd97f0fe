diesel::table! {
    profiles (id) {
        id -> Uuid,
        email -> Text,
        display_name -> Text,
        role -> Text,
        status -> Text,
        organization -> Text,
        avatar_url -> Nullable<Text>,
        password_hash -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sessions (token) {
        token -> Text,
        profile_id -> Uuid,
        display_name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    audit_events (id) {
        id -> Uuid,
        action -> Text,
        details -> Text,
        actor_id -> Nullable<Uuid>,
        actor_name -> Text,
        target_id -> Nullable<Uuid>,
        occurred_at -> Timestamptz,
    }
}

diesel::table! {
    intake_items (id) {
        id -> Uuid,
        title -> Text,
        description -> Text,
        client -> Text,
        requestor -> Text,
        priority -> Text,
        status -> Text,
        sla_due_at -> Timestamptz,
        assignee -> Nullable<Text>,
        tags -> Array<Text>,
        ai_triage -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    approvals (id) {
        id -> Uuid,
        title -> Text,
        description -> Text,
        client -> Text,
        status -> Text,
        due_date -> Nullable<Timestamptz>,
        token -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    approval_events (id) {
        id -> Uuid,
        approval_id -> Uuid,
        kind -> Text,
        description -> Text,
        occurred_at -> Timestamptz,
    }
}

diesel::table! {
    budgets (id) {
        id -> Uuid,
        client_name -> Text,
        title -> Text,
        items -> Jsonb,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    deliverables (id) {
        id -> Uuid,
        name -> Text,
        client_name -> Text,
        kind -> Text,
        checks -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    clients (id) {
        id -> Uuid,
        name -> Text,
        contact_email -> Text,
        status -> Text,
        owner_name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    contracts (id) {
        id -> Uuid,
        client_id -> Uuid,
        title -> Text,
        value -> Float8,
        status -> Text,
        start_date -> Nullable<Timestamptz>,
        end_date -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reports (id) {
        id -> Uuid,
        title -> Text,
        period -> Text,
        narrative -> Nullable<Text>,
        status -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}
