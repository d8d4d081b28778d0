/// Interaction lifecycle: `idle → hover → focused(selection | context) →
/// idle`, with one authoritative transition function instead of event
/// handlers mutating shared fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Hover {
        node: usize,
    },
    Focused {
        selection: Vec<usize>,
        context: Option<usize>,
        hover: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEvent {
    HoverEnter(usize),
    HoverLeave,
    Select(Vec<usize>),
    ContextOpen(usize),
    ContextClose,
    Clear,
}

impl Interaction {
    pub fn apply(self, event: InteractionEvent) -> Interaction {
        use Interaction::*;
        use InteractionEvent::*;

        match (self, event) {
            (state, HoverEnter(node)) => match state {
                Focused {
                    selection, context, ..
                } => Focused {
                    selection,
                    context,
                    hover: Some(node),
                },
                _ => Hover { node },
            },
            (state, HoverLeave) => match state {
                Focused {
                    selection, context, ..
                } => Focused {
                    selection,
                    context,
                    hover: None,
                },
                _ => Idle,
            },
            (state, Select(selection)) => {
                let (context, hover) = match state {
                    Focused { context, hover, .. } => (context, hover),
                    Hover { node } => (None, Some(node)),
                    Idle => (None, None),
                };
                if selection.is_empty() && context.is_none() {
                    match hover {
                        Some(node) => Hover { node },
                        None => Idle,
                    }
                } else {
                    Focused {
                        selection,
                        context,
                        hover,
                    }
                }
            }
            (state, ContextOpen(node)) => {
                let (selection, hover) = match state {
                    Focused {
                        selection, hover, ..
                    } => (selection, hover),
                    Hover { node } => (Vec::new(), Some(node)),
                    Idle => (Vec::new(), None),
                };
                Focused {
                    selection,
                    context: Some(node),
                    hover,
                }
            }
            (state, ContextClose) => match state {
                Focused {
                    selection, hover, ..
                } => {
                    if selection.is_empty() {
                        match hover {
                            Some(node) => Hover { node },
                            None => Idle,
                        }
                    } else {
                        Focused {
                            selection,
                            context: None,
                            hover,
                        }
                    }
                }
                other => other,
            },
            (_, Clear) => Idle,
        }
    }

    pub fn hovered(&self) -> Option<usize> {
        match self {
            Interaction::Hover { node } => Some(*node),
            Interaction::Focused { hover, .. } => *hover,
            Interaction::Idle => None,
        }
    }

    pub fn selected(&self) -> &[usize] {
        match self {
            Interaction::Focused { selection, .. } => selection,
            _ => &[],
        }
    }

    pub fn context(&self) -> Option<usize> {
        match self {
            Interaction::Focused { context, .. } => *context,
            _ => None,
        }
    }

    /// Focus seeds: selection plus context node.
    pub fn seeds(&self) -> Vec<usize> {
        let mut seeds = self.selected().to_vec();
        if let Some(ctx) = self.context() {
            if !seeds.contains(&ctx) {
                seeds.push(ctx);
            }
        }
        seeds
    }
}
