//! Diesel schema for marketplace persistence.

diesel::table! {
    /// Tasks posted by clients.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Poster identifier.
        #[max_length = 128]
        client_id -> Varchar,
        /// Short title.
        #[max_length = 200]
        title -> Varchar,
        /// Optional long-form description.
        description -> Nullable<Text>,
        /// Optional budget in minor currency units.
        budget -> Nullable<Int8>,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Denormalized count of bids referencing the task.
        bids_count -> Int8,
        /// Bidder whose offer was accepted.
        #[max_length = 128]
        assigned_bidder -> Nullable<Varchar>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Bids placed against tasks; deleted with their task.
    bids (id) {
        /// Bid identifier.
        id -> Uuid,
        /// Parent task identifier.
        task_id -> Uuid,
        /// Bidder identifier.
        #[max_length = 128]
        bidder_id -> Varchar,
        /// Offered amount in minor currency units.
        amount -> Int8,
        /// Optional note to the client.
        message -> Nullable<Text>,
        /// Decision status.
        #[max_length = 20]
        status -> Varchar,
        /// Optional submission deduplication token.
        #[max_length = 128]
        idempotency_key -> Nullable<Varchar>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(bids -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, bids);
