use crate::{
    domain::{
        models::event::EventEnvelope, repositories::user_store::UserStore,
        services::id_generator::IdGenerator,
    },
    infrastructure::in_memory_event_bus::Subscription,
    usecase::process_registration_usecase::ProcessRegistrationUsecase,
};

/// Feeds batches from the registration topic into the consumer and reports
/// the failed subset back for redelivery
pub struct RegistrationSubscriber<S: UserStore, G: IdGenerator> {
    usecase: ProcessRegistrationUsecase<S, G>,
    subscription: Subscription,
    max_batch_size: usize,
}

impl<S: UserStore, G: IdGenerator> RegistrationSubscriber<S, G> {
    pub fn new(
        usecase: ProcessRegistrationUsecase<S, G>,
        subscription: Subscription,
        max_batch_size: usize,
    ) -> Self {
        Self {
            usecase,
            subscription,
            max_batch_size,
        }
    }

    /// Run until the topic is closed and drained, handing back the subscription
    pub async fn run(mut self) -> Subscription {
        tracing::info!(
            topic = self.subscription.topic(),
            max_batch_size = self.max_batch_size,
            "Listening for user registration events"
        );

        while let Some(batch) = self.subscription.next_batch(self.max_batch_size).await {
            let envelopes: Vec<EventEnvelope> =
                batch.iter().map(|d| d.envelope.clone()).collect();

            let report = self.usecase.process_batch(&envelopes).await.into_response();
            self.subscription.settle(batch, &report);
        }

        tracing::info!(
            topic = self.subscription.topic(),
            dead_letters = self.subscription.dead_letters().len(),
            "Registration topic closed"
        );
        self.subscription
    }
}
