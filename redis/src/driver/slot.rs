use crate::resolver::Resolver;

/// one entry in the reply-correlation queue. a real command gets a `Real` slot holding its
/// resolver; the synthetic `MULTI` a transaction body is wrapped in gets a `Placeholder` so
/// its "+OK" acknowledgement is consumed without disturbing resolver order.
pub(crate) enum Slot {
    Real(Resolver),
    Placeholder,
}
