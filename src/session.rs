use url::Url;

/// Progress of the offer/answer exchange. Phases only move forward;
/// `Failed` is terminal and reachable from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NegotiationPhase {
    Idle,
    OfferFetched,
    RemoteDescriptionSet,
    AnswerCreated,
    LocalDescriptionSet,
    AnswerSubmitted,
    Failed,
}

/// State of the single playback session.
///
/// Exclusively owned by the task driving the negotiation; nothing else
/// mutates it.
#[derive(Debug)]
pub struct Session {
    endpoint_url: Url,
    session_url: Option<Url>,
    remote_offer: Option<String>,
    local_answer: Option<String>,
    phase: NegotiationPhase,
}

impl Session {
    pub fn new(endpoint_url: Url) -> Self {
        Self {
            endpoint_url,
            session_url: None,
            remote_offer: None,
            local_answer: None,
            phase: NegotiationPhase::Idle,
        }
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    pub fn endpoint_url(&self) -> &Url {
        &self.endpoint_url
    }

    pub fn session_url(&self) -> Option<&Url> {
        self.session_url.as_ref()
    }

    pub fn remote_offer(&self) -> Option<&str> {
        self.remote_offer.as_deref()
    }

    pub fn local_answer(&self) -> Option<&str> {
        self.local_answer.as_deref()
    }

    /// The offer body and the session resource URL are always recorded
    /// together, by the transition out of `Idle`.
    pub fn offer_fetched(&mut self, remote_offer: String, session_url: Url) {
        self.remote_offer = Some(remote_offer);
        self.session_url = Some(session_url);
        self.advance(NegotiationPhase::OfferFetched);
    }

    pub fn remote_description_set(&mut self) {
        self.advance(NegotiationPhase::RemoteDescriptionSet);
    }

    pub fn answer_created(&mut self, local_answer: String) {
        debug_assert!(self.remote_offer.is_some(), "answer without an offer");
        self.local_answer = Some(local_answer);
        self.advance(NegotiationPhase::AnswerCreated);
    }

    pub fn local_description_set(&mut self) {
        self.advance(NegotiationPhase::LocalDescriptionSet);
    }

    pub fn answer_submitted(&mut self) {
        self.advance(NegotiationPhase::AnswerSubmitted);
    }

    /// The PATCH step consumes the session URL and the answer together;
    /// both exist from `AnswerCreated` onwards.
    pub fn submission(&self) -> Option<(&Url, &str)> {
        match (&self.session_url, &self.local_answer) {
            (Some(session_url), Some(answer)) => Some((session_url, answer.as_str())),
            _ => None,
        }
    }

    pub fn fail(&mut self) {
        if matches!(
            self.phase,
            NegotiationPhase::AnswerSubmitted | NegotiationPhase::Failed
        ) {
            return;
        }
        self.phase = NegotiationPhase::Failed;
    }

    fn advance(&mut self, next: NegotiationPhase) {
        debug_assert!(self.phase < next, "negotiation phase cannot move backwards");
        self.phase = next;
    }
}
