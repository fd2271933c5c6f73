pub type ProductId = i64;
pub type Quantity = u64;

/// A change in a product's quantity.
///
/// `old_quantity` is `None` when the product is new, `new_quantity` is `None`
/// when it was removed. Zero is a real quantity and is distinct from `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub product_id: ProductId,
    pub old_quantity: Option<Quantity>,
    pub new_quantity: Option<Quantity>,
}

impl Update {
    pub fn new(
        product_id: ProductId,
        old_quantity: Option<Quantity>,
        new_quantity: Option<Quantity>,
    ) -> Self {
        Self {
            product_id,
            old_quantity,
            new_quantity,
        }
    }

    pub fn classification(&self) -> UpdateClassification {
        UpdateClassification::classify(Some(self))
    }
}

/// What kind of stock transition an update represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateClassification {
    Uncategorized,
    BackInStock,
    OutOfStock,
    Tombstone,
}

impl UpdateClassification {
    /// Classify an update; `None` is a tombstone.
    pub fn classify(update: Option<&Update>) -> Self {
        let Some(update) = update else {
            return Self::Tombstone;
        };

        match (update.old_quantity, update.new_quantity) {
            (Some(0), Some(new)) if new > 0 => Self::BackInStock,
            (Some(old), Some(0)) if old > 0 => Self::OutOfStock,
            _ => Self::Uncategorized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uncategorized => "Uncategorized",
            Self::BackInStock => "BackInStock",
            Self::OutOfStock => "OutOfStock",
            Self::Tombstone => "Tombstone",
        }
    }

    /// The notification this classification produces, if any.
    pub fn notification_kind(&self) -> Option<NotificationKind> {
        match self {
            Self::BackInStock => Some(NotificationKind::BackInStock),
            Self::OutOfStock => Some(NotificationKind::OutOfStock),
            Self::Uncategorized | Self::Tombstone => None,
        }
    }
}

impl std::fmt::Display for UpdateClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of classifications that are published downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    BackInStock,
    OutOfStock,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BackInStock => "BackInStock",
            NotificationKind::OutOfStock => "OutOfStock",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something interesting happened to a product's stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl Notification {
    /// Build the notification for an update, or `None` when the update is not
    /// a back-in-stock / out-of-stock transition.
    pub fn from_update(update: &Update) -> Option<Self> {
        let kind = update.classification().notification_kind()?;
        // Both qualifying classifications guarantee a new quantity.
        let quantity = update.new_quantity?;

        Some(Self {
            kind,
            product_id: update.product_id,
            quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(old: Option<Quantity>, new: Option<Quantity>) -> Update {
        Update::new(123, old, new)
    }

    #[test]
    fn test_tombstone_when_update_absent() {
        assert_eq!(
            UpdateClassification::classify(None),
            UpdateClassification::Tombstone
        );
    }

    #[test]
    fn test_back_in_stock() {
        assert_eq!(
            update(Some(0), Some(10)).classification(),
            UpdateClassification::BackInStock
        );
        assert_eq!(
            update(Some(0), Some(1)).classification(),
            UpdateClassification::BackInStock
        );
    }

    #[test]
    fn test_out_of_stock() {
        assert_eq!(
            update(Some(10), Some(0)).classification(),
            UpdateClassification::OutOfStock
        );
    }

    #[test]
    fn test_non_zero_change_is_uncategorized() {
        assert_eq!(
            update(Some(10), Some(5)).classification(),
            UpdateClassification::Uncategorized
        );
        assert_eq!(
            update(Some(5), Some(500)).classification(),
            UpdateClassification::Uncategorized
        );
    }

    #[test]
    fn test_unchanged_quantity_is_uncategorized() {
        assert_eq!(
            update(Some(0), Some(0)).classification(),
            UpdateClassification::Uncategorized
        );
        assert_eq!(
            update(Some(7), Some(7)).classification(),
            UpdateClassification::Uncategorized
        );
    }

    #[test]
    fn test_missing_side_is_uncategorized() {
        // New product created with no stock
        assert_eq!(
            update(None, Some(0)).classification(),
            UpdateClassification::Uncategorized
        );
        assert_eq!(
            update(None, Some(10)).classification(),
            UpdateClassification::Uncategorized
        );
        // Deleted product
        assert_eq!(
            update(Some(0), None).classification(),
            UpdateClassification::Uncategorized
        );
        assert_eq!(
            update(Some(10), None).classification(),
            UpdateClassification::Uncategorized
        );
        assert_eq!(
            update(None, None).classification(),
            UpdateClassification::Uncategorized
        );
    }

    #[test]
    fn test_classification_display() {
        assert_eq!(UpdateClassification::BackInStock.to_string(), "BackInStock");
        assert_eq!(UpdateClassification::OutOfStock.to_string(), "OutOfStock");
        assert_eq!(UpdateClassification::Tombstone.to_string(), "Tombstone");
        assert_eq!(
            UpdateClassification::Uncategorized.to_string(),
            "Uncategorized"
        );
    }

    #[test]
    fn test_only_transitions_have_notification_kind() {
        assert_eq!(
            UpdateClassification::BackInStock.notification_kind(),
            Some(NotificationKind::BackInStock)
        );
        assert_eq!(
            UpdateClassification::OutOfStock.notification_kind(),
            Some(NotificationKind::OutOfStock)
        );
        assert_eq!(UpdateClassification::Uncategorized.notification_kind(), None);
        assert_eq!(UpdateClassification::Tombstone.notification_kind(), None);
    }

    #[test]
    fn test_notification_uses_new_quantity() {
        let notification = Notification::from_update(&update(Some(0), Some(10))).unwrap();
        assert_eq!(
            notification,
            Notification {
                kind: NotificationKind::BackInStock,
                product_id: 123,
                quantity: 10,
            }
        );

        let notification = Notification::from_update(&update(Some(10), Some(0))).unwrap();
        assert_eq!(notification.kind, NotificationKind::OutOfStock);
        assert_eq!(notification.quantity, 0);
    }

    #[test]
    fn test_no_notification_for_uncategorized() {
        assert!(Notification::from_update(&update(Some(10), Some(5))).is_none());
        assert!(Notification::from_update(&update(None, Some(0))).is_none());
    }
}
